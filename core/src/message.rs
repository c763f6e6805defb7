//! Outgoing message data.
//!
//! These are plain descriptions of what should be sent; the platform adapter
//! turns them into real payloads. Nothing here talks to the network.

use chrono::{DateTime, Utc};

/// Embed colours used by the service.
pub mod colors {
    /// Default colour for every service embed.
    pub const BLACK: u32 = 0x00_0000;
    /// Moderation-log colour for destructive actions.
    pub const TOMATO: u32 = 0xFF_6347;
}

/// One field inside an embed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedField {
    /// Field heading.
    pub name: String,
    /// Field body.
    pub value: String,
    /// Render next to the previous field.
    pub inline: bool,
}

/// Rich embed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Embed {
    /// Title line.
    pub title: Option<String>,
    /// Main body text.
    pub description: Option<String>,
    /// Sidebar colour.
    pub color: u32,
    /// Additional fields.
    pub fields: Vec<EmbedField>,
    /// Footer text.
    pub footer: Option<String>,
    /// Timestamp shown in the footer.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    /// Black embed with a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            color: colors::BLACK,
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Set the footer.
    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub const fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Override the colour.
    #[must_use]
    pub const fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }
}

/// Button colour/semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    /// Blurple.
    Primary,
    /// Green.
    Success,
    /// Red.
    Danger,
    /// Opens a URL.
    Link,
}

/// What pressing a button does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    /// Emits an interaction carrying this component id.
    CustomId(String),
    /// Opens a URL in the client.
    Url(String),
}

/// A clickable button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    /// Visual style.
    pub style: ButtonStyle,
    /// Label text.
    pub label: String,
    /// Optional emoji shown before the label.
    pub emoji: Option<String>,
    /// Press behaviour.
    pub action: ButtonAction,
}

impl Button {
    /// Interaction button.
    #[must_use]
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            style,
            label: label.into(),
            emoji: None,
            action: ButtonAction::CustomId(custom_id.into()),
        }
    }

    /// Link button.
    #[must_use]
    pub fn link(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            style: ButtonStyle::Link,
            label: label.into(),
            emoji: None,
            action: ButtonAction::Url(url.into()),
        }
    }

    /// Attach an emoji.
    #[must_use]
    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Component id, for interaction buttons.
    #[must_use]
    pub fn custom_id(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::CustomId(id) => Some(id),
            ButtonAction::Url(_) => None,
        }
    }
}

/// One entry in a select menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    /// Shown to the user.
    pub label: String,
    /// Sent back on selection.
    pub value: String,
}

/// Drop-down menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectMenu {
    /// Component id.
    pub custom_id: String,
    /// Placeholder text.
    pub placeholder: String,
    /// Choices.
    pub options: Vec<SelectOption>,
}

/// Interactive component in a message row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Component {
    /// A button.
    Button(Button),
    /// A select menu.
    Select(SelectMenu),
}

/// File attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown in the client.
    pub filename: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

/// A message to send, edit into place, or use as an interaction response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Plain text content.
    pub content: Option<String>,
    /// Embeds.
    pub embeds: Vec<Embed>,
    /// One row of components.
    pub components: Vec<Component>,
    /// File attachments.
    pub attachments: Vec<Attachment>,
    /// Only visible to the interacting user.
    pub ephemeral: bool,
}

impl OutgoingMessage {
    /// Text-only message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Single-embed message.
    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    /// Add text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Add a button.
    #[must_use]
    pub fn with_button(mut self, button: Button) -> Self {
        self.components.push(Component::Button(button));
        self
    }

    /// Add a select menu.
    #[must_use]
    pub fn with_select(mut self, menu: SelectMenu) -> Self {
        self.components.push(Component::Select(menu));
        self
    }

    /// Add an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Mark as ephemeral.
    #[must_use]
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Component ids of every interaction button, in order.
    #[must_use]
    pub fn button_ids(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter_map(|c| match c {
                Component::Button(b) => b.custom_id(),
                Component::Select(_) => None,
            })
            .collect()
    }
}

/// Text input style inside a modal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextInputStyle {
    /// Single line.
    Short,
    /// Multi-line.
    Paragraph,
}

/// One text input in a modal form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextInput {
    /// Field id, echoed back on submission.
    pub custom_id: String,
    /// Label above the input.
    pub label: String,
    /// Input style.
    pub style: TextInputStyle,
    /// Greyed-out hint.
    pub placeholder: String,
    /// Whether the form refuses to submit without a value.
    pub required: bool,
}

/// A modal form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Modal {
    /// Component id of the submission.
    pub custom_id: String,
    /// Window title.
    pub title: String,
    /// Inputs, one per row.
    pub inputs: Vec<TextInput>,
}
