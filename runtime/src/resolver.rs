//! Counterparty resolution from free-form input.
//!
//! Stages run in order and the first hit wins:
//!
//! | Stage | Input | Lookup |
//! |-------|-------|--------|
//! | 1 | 17–19 digit id | direct user lookup |
//! | 2 | `<@id>` / `<@!id>` | direct user lookup |
//! | 3 | `name#1234` | member scan, username + discriminator |
//! | 4 | display name, exact | member scan |
//! | 5 | username, exact | member scan |
//! | 6 | display name, substring | member scan |
//! | 7 | username, substring | member scan |
//!
//! Name comparisons are case-insensitive. The member list is fetched at most
//! once per resolution; a failed fetch counts as an empty list.

use middleman_core::ids::{GuildId, UserId};
use middleman_core::providers::{ChatPlatform, Member, UserProfile};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static RAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{17,19}$").expect("id pattern is a valid regex"));

#[allow(clippy::expect_used)]
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d{17,19})>$").expect("mention pattern is a valid regex"));

/// Which stage produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStage {
    /// Raw numeric id.
    Id,
    /// Mention syntax.
    Mention,
    /// Legacy `name#1234`.
    Tag,
    /// Exact display name.
    DisplayName,
    /// Exact username.
    Username,
    /// Display name contains the input.
    DisplayNameContains,
    /// Username contains the input.
    UsernameContains,
}

/// A resolved counterparty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The account.
    pub user: UserProfile,
    /// How it was found.
    pub stage: MatchStage,
}

/// Staged resolver bound to one guild.
pub struct UserResolver<'a, P> {
    platform: &'a P,
    guild: GuildId,
}

impl<'a, P: ChatPlatform> UserResolver<'a, P> {
    /// Bind a resolver to a guild.
    pub const fn new(platform: &'a P, guild: GuildId) -> Self {
        Self { platform, guild }
    }

    /// Resolve `input` to an account. Blank input never resolves.
    pub async fn resolve(&self, input: &str) -> Option<Resolution> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if RAW_ID.is_match(input) {
            if let Some(user) = self.lookup(input).await {
                return Some(Resolution { user, stage: MatchStage::Id });
            }
        }
        if let Some(id) = MENTION.captures(input).and_then(|c| c.get(1)) {
            if let Some(user) = self.lookup(id.as_str()).await {
                return Some(Resolution { user, stage: MatchStage::Mention });
            }
        }

        let members = self.members().await;

        if let Some((name, discriminator)) = split_tag(input) {
            let hit = members.iter().find(|m| {
                m.user.username.to_lowercase() == name
                    && m.user.discriminator.as_deref() == Some(discriminator)
            });
            if let Some(member) = hit {
                return Some(found(member, MatchStage::Tag));
            }
        }

        let needle = input.to_lowercase();
        let stages: [(MatchStage, fn(&Member, &str) -> bool); 4] = [
            (MatchStage::DisplayName, |m, n| m.display_name().to_lowercase() == n),
            (MatchStage::Username, |m, n| m.user.username.to_lowercase() == n),
            (MatchStage::DisplayNameContains, |m, n| {
                m.display_name().to_lowercase().contains(n)
            }),
            (MatchStage::UsernameContains, |m, n| m.user.username.to_lowercase().contains(n)),
        ];
        stages.iter().find_map(|(stage, matches)| {
            members
                .iter()
                .find(|m| matches(m, &needle))
                .map(|m| found(m, *stage))
        })
    }

    async fn lookup(&self, raw: &str) -> Option<UserProfile> {
        let id: UserId = raw.parse().ok()?;
        match self.platform.user(id).await {
            Ok(user) => user,
            Err(e) => {
                debug!(user_id = %id, error = %e, "User lookup failed");
                None
            }
        }
    }

    async fn members(&self) -> Vec<Member> {
        self.platform
            .guild_members(self.guild)
            .await
            .unwrap_or_else(|e| {
                debug!(guild_id = %self.guild, error = %e, "Member enumeration failed");
                Vec::new()
            })
    }
}

fn found(member: &Member, stage: MatchStage) -> Resolution {
    Resolution {
        user: member.user.clone(),
        stage,
    }
}

/// Split `name#1234` into a lowercased name and the four digits.
fn split_tag(input: &str) -> Option<(String, &str)> {
    let mut parts = input.split('#');
    let name = parts.next()?;
    let discriminator = parts.next()?;
    (discriminator.len() == 4 && discriminator.bytes().all(|b| b.is_ascii_digit()))
        .then(|| (name.to_lowercase(), discriminator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_needs_four_digits() {
        assert_eq!(split_tag("Jane#0420"), Some(("jane".to_string(), "0420")));
        assert_eq!(split_tag("Jane#42"), None);
        assert_eq!(split_tag("Jane"), None);
        assert_eq!(split_tag("Jane#12a4"), None);
    }

    #[test]
    fn id_and_mention_patterns_are_anchored() {
        assert!(RAW_ID.is_match("123456789012345678"));
        assert!(!RAW_ID.is_match("x123456789012345678"));
        assert!(MENTION.is_match("<@!123456789012345678>"));
        assert!(!MENTION.is_match("hi <@123456789012345678>"));
    }
}
