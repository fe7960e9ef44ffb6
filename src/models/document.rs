use quick_xml::escape::escape;

/// Vendor schema namespace used by most image resources.
pub const VENDOR_NAMESPACE: &str = "http://www.hikvision.com/ver20/XMLSchema";

/// Generic ISAPI schema namespace used by a few resources (shutter,
/// sharpness, certificate requests).
pub const ISAPI_NAMESPACE: &str = "http://www.isapi.org/ver20/XMLSchema";

/// Value carried by one field of a [`ParameterDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// `<tag>value</tag>`
    Text(String),
    /// `<tag></tag>`: sent, but without content.
    Empty,
    /// Nested fields under `<tag>`.
    Group(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// A partial configuration document for one resource.
///
/// Only the fields pushed onto the document are sent. The device keeps its
/// current value for every field that is absent. A field pushed with
/// [`ParameterDocument::empty`] is sent as an empty element, which is a
/// different request from leaving it out. Values are not range checked:
/// the device clamps numbers above the maximum to the maximum, numbers below
/// the minimum to 0, and answers `badParameters` for malformed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDocument {
    root: String,
    namespace: Option<&'static str>,
    fields: Vec<Field>,
}

impl ParameterDocument {
    /// A document with a bare root element.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespace: None,
            fields: Vec::new(),
        }
    }

    /// A document whose root carries `xmlns` and `version="2.0"`.
    pub fn with_namespace(root: impl Into<String>, namespace: &'static str) -> Self {
        Self {
            root: root.into(),
            namespace: Some(namespace),
            fields: Vec::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sets `name` to `value`, replacing an earlier entry with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.put(name.into(), FieldValue::Text(value.to_string()))
    }

    /// Sends `name` as an empty element.
    pub fn empty(&mut self, name: impl Into<String>) -> &mut Self {
        self.put(name.into(), FieldValue::Empty)
    }

    /// Sets a nested group of fields under `name`.
    pub fn group(&mut self, name: impl Into<String>, fields: Vec<Field>) -> &mut Self {
        self.put(name.into(), FieldValue::Group(fields))
    }

    /// Removes `name` so that it is omitted from the request.
    pub fn omit(&mut self, name: &str) -> &mut Self {
        self.fields.retain(|f| f.name != name);
        self
    }

    fn put(&mut self, name: String, value: FieldValue) -> &mut Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
        self
    }

    /// Renders the document with an XML declaration.
    pub fn render(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        match self.namespace {
            Some(ns) => out.push_str(&format!(r#"<{} xmlns="{}" version="2.0">"#, self.root, ns)),
            None => out.push_str(&format!("<{}>", self.root)),
        }
        render_fields(&mut out, &self.fields);
        out.push_str(&format!("</{}>", self.root));
        out
    }
}

impl Field {
    pub fn text(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.to_string()),
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Empty,
        }
    }
}

fn render_fields(out: &mut String, fields: &[Field]) {
    for field in fields {
        out.push_str(&format!("<{}>", field.name));
        match &field.value {
            FieldValue::Text(text) => out.push_str(&escape(text.as_str())),
            FieldValue::Empty => {}
            FieldValue::Group(children) => render_fields(out, children),
        }
        out.push_str(&format!("</{}>", field.name));
    }
}
