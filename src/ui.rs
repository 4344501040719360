use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            content_description: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_file_picker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Echoed back by the host as `bindings` when the button fires.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<&'a str, String>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            id: None,
            requires_file_picker: None,
            enabled: None,
            bindings: BTreeMap::new(),
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn requires_file_picker(mut self, needs: bool) -> Self {
        self.requires_file_picker = Some(needs);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn binding(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.bindings.insert(key, value.into());
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Column",
            padding: None,
            children,
            content_description: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Checkbox<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
}

impl<'a> Checkbox<'a> {
    pub fn new(text: &'a str, bind_key: &'a str) -> Self {
        Self {
            kind: "Checkbox",
            text,
            bind_key,
            checked: None,
            action: None,
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_on_submit: Option<&'a str>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            text: None,
            hint: None,
            action_on_submit: None,
        }
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn action_on_submit(mut self, action: &'a str) -> Self {
        self.action_on_submit = Some(action);
        self
    }
}

#[derive(Serialize)]
pub struct Progress<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
}

impl<'a> Progress<'a> {
    pub fn new() -> Self {
        Self {
            kind: "Progress",
            text: None,
        }
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }
}

/// The rendered page. The host rasterises `page` of the loaded document at
/// `scale`/`rotation` and lays `children` over it in page percentages.
#[derive(Serialize)]
pub struct PageView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub page: u32,
    pub page_count: u32,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub rotation: u16,
    pub click_action: Option<&'static str>,
    pub children: Vec<serde_json::Value>,
}

impl PageView {
    pub fn new(page: u32, page_count: u32, width: f64, height: f64) -> Self {
        Self {
            kind: "PageView",
            page,
            page_count,
            width,
            height,
            scale: 1.0,
            rotation: 0,
            click_action: None,
            children: Vec::new(),
        }
    }

    pub fn viewport(mut self, scale: f64, rotation: u16) -> Self {
        self.scale = scale;
        self.rotation = rotation;
        self
    }

    /// Taps are reported through `action` with `click_x`/`click_y` bindings.
    pub fn clickable(mut self, action: &'static str) -> Self {
        self.click_action = Some(action);
        self
    }

    pub fn children(mut self, children: Vec<serde_json::Value>) -> Self {
        self.children = children;
        self
    }
}

/// Tappable candidate box, in page percentages.
#[derive(Serialize)]
pub struct Highlight<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: &'a str,
    pub action: &'a str,
    pub bindings: BTreeMap<&'a str, String>,
}

impl<'a> Highlight<'a> {
    pub fn new(x: f64, y: f64, width: f64, height: f64, label: &'a str) -> Self {
        Self {
            kind: "Highlight",
            x,
            y,
            width,
            height,
            label,
            action: "candidate_click",
            bindings: BTreeMap::new(),
        }
    }

    pub fn binding(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.bindings.insert(key, value.into());
        self
    }
}

/// Placed signature preview, in page percentages.
#[derive(Serialize)]
pub struct SignatureOverlay {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: u16,
    pub image: String,
}

impl SignatureOverlay {
    pub fn new(x: f64, y: f64, image: String) -> Self {
        Self {
            kind: "SignatureOverlay",
            x,
            y,
            scale: 1.0,
            rotation: 0,
            image,
        }
    }

    pub fn transform(mut self, scale: f64, rotation: u16) -> Self {
        self.scale = scale;
        self.rotation = rotation;
        self
    }
}
