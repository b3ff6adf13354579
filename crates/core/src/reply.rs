use serde::Serialize;

/// Outbound payload produced by handlers and conversations: plain text or
/// text plus legacy-style attachments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub actions: Vec<ActionElement>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn pretext(mut self, pretext: impl Into<String>) -> Self {
        self.pretext = Some(pretext.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Marks the attachment interactive; the callback id is echoed back with
    /// every action invoked on it.
    pub fn callback_id(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.into());
        self
    }

    pub fn action(mut self, action: ActionElement) -> Self {
        if self.attachment_type.is_none() {
            self.attachment_type = Some("default".to_owned());
        }
        self.actions.push(action);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    Primary,
    Danger,
}

/// Confirmation popup shown before a button action fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub title: String,
    pub text: String,
    pub ok_text: String,
    pub dismiss_text: String,
}

impl Confirmation {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        ok_text: impl Into<String>,
        dismiss_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ok_text: ok_text.into(),
            dismiss_text: dismiss_text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: text.into(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        name: String,
        text: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ActionStyle>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confirm: Option<Confirmation>,
    },
    Select {
        name: String,
        text: String,
        options: Vec<SelectOption>,
    },
}

impl ActionElement {
    pub fn button(
        name: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Button {
            name: name.into(),
            text: label.into(),
            value: value.into(),
            style: None,
            confirm: None,
        }
    }

    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::Select { name: name.into(), text: label.into(), options }
    }

    pub fn style(mut self, new_style: ActionStyle) -> Self {
        if let Self::Button { style, .. } = &mut self {
            *style = Some(new_style);
        }
        self
    }

    pub fn confirm(mut self, confirmation: Confirmation) -> Self {
        if let Self::Button { confirm, .. } = &mut self {
            *confirm = Some(confirmation);
        }
        self
    }
}

/// Structured multi-field input form, distinct from a conversation prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dialog {
    pub title: String,
    pub callback_id: String,
    pub submit_label: String,
    pub elements: Vec<DialogElement>,
}

impl Dialog {
    pub fn builder(
        title: impl Into<String>,
        callback_id: impl Into<String>,
        submit_label: impl Into<String>,
    ) -> DialogBuilder {
        DialogBuilder {
            title: title.into(),
            callback_id: callback_id.into(),
            submit_label: submit_label.into(),
            elements: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogElement {
    Text {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Email {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Select {
        label: String,
        name: String,
        options: Vec<SelectOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Textarea {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Url {
        label: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

pub struct DialogBuilder {
    title: String,
    callback_id: String,
    submit_label: String,
    elements: Vec<DialogElement>,
}

impl DialogBuilder {
    pub fn text(
        mut self,
        label: impl Into<String>,
        name: impl Into<String>,
        value: Option<&str>,
    ) -> Self {
        self.elements.push(DialogElement::Text {
            label: label.into(),
            name: name.into(),
            value: value.map(str::to_owned),
        });
        self
    }

    pub fn email(
        mut self,
        label: impl Into<String>,
        name: impl Into<String>,
        value: Option<&str>,
    ) -> Self {
        self.elements.push(DialogElement::Email {
            label: label.into(),
            name: name.into(),
            value: value.map(str::to_owned),
        });
        self
    }

    pub fn select(
        mut self,
        label: impl Into<String>,
        name: impl Into<String>,
        options: Vec<SelectOption>,
        placeholder: Option<&str>,
    ) -> Self {
        self.elements.push(DialogElement::Select {
            label: label.into(),
            name: name.into(),
            options,
            placeholder: placeholder.map(str::to_owned),
        });
        self
    }

    pub fn textarea(
        mut self,
        label: impl Into<String>,
        name: impl Into<String>,
        value: Option<&str>,
        placeholder: Option<&str>,
    ) -> Self {
        self.elements.push(DialogElement::Textarea {
            label: label.into(),
            name: name.into(),
            value: value.map(str::to_owned),
            placeholder: placeholder.map(str::to_owned),
        });
        self
    }

    pub fn url(
        mut self,
        label: impl Into<String>,
        name: impl Into<String>,
        value: Option<&str>,
    ) -> Self {
        self.elements.push(DialogElement::Url {
            label: label.into(),
            name: name.into(),
            value: value.map(str::to_owned),
        });
        self
    }

    pub fn build(self) -> Dialog {
        Dialog {
            title: self.title,
            callback_id: self.callback_id,
            submit_label: self.submit_label,
            elements: self.elements,
        }
    }
}
