//! Minimal XML-RPC encoding and decoding.
//!
//! Only what the subtitle service needs: method calls with positional
//! params, and responses carrying a single value or a fault.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed XML-RPC document: {0}")]
    Malformed(String),

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

impl RpcError {
    /// Timeouts are worth one more attempt; everything else is final.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Http(e) if e.is_timeout())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Base64(String),
    DateTime(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Base64(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Reads a struct member as text. Numeric ids are stringified since the
    /// service is not consistent about which it sends.
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) | Value::Base64(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Struct(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn malformed(e: impl std::fmt::Display) -> RpcError {
    RpcError::Malformed(e.to_string())
}

fn start(writer: &mut XmlWriter, name: &str) -> Result<(), RpcError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(malformed)
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<(), RpcError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(malformed)
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), RpcError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(malformed)?;
    end(writer, name)
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> Result<(), RpcError> {
    start(writer, "value")?;
    match value {
        Value::Int(i) => text_element(writer, "int", &i.to_string())?,
        Value::Bool(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::Double(d) => text_element(writer, "double", &d.to_string())?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Base64(s) => text_element(writer, "base64", s)?,
        Value::DateTime(s) => text_element(writer, "dateTime.iso8601", s)?,
        Value::Nil => writer
            .write_event(Event::Empty(BytesStart::new("nil")))
            .map(|_| ())
            .map_err(malformed)?,
        Value::Array(items) => {
            start(writer, "array")?;
            start(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            end(writer, "data")?;
            end(writer, "array")?;
        }
        Value::Struct(members) => {
            start(writer, "struct")?;
            for (name, member) in members {
                start(writer, "member")?;
                text_element(writer, "name", name)?;
                write_value(writer, member)?;
                end(writer, "member")?;
            }
            end(writer, "struct")?;
        }
    }
    end(writer, "value")
}

/// Serializes a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, RpcError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(malformed)?;

    start(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    start(&mut writer, "params")?;
    for param in params {
        start(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        end(&mut writer, "param")?;
    }
    end(&mut writer, "params")?;
    end(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(malformed)
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&Node, RpcError> {
        self.child(name)
            .ok_or_else(|| RpcError::Malformed(format!("<{}> has no <{name}>", self.name)))
    }
}

fn parse_tree(xml: &str) -> Result<Node, RpcError> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Node::named(b"#document")];

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => stack.push(Node::named(e.name().as_ref())),
            Event::Empty(e) => {
                let node = Node::named(e.name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| RpcError::Malformed("unbalanced end tag".into()))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| RpcError::Malformed("unbalanced end tag".into()))?;
                parent.children.push(node);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(document), true) => Ok(document),
        _ => Err(RpcError::Malformed("unclosed element".into())),
    }
}

fn parse_number<T: std::str::FromStr>(node: &Node) -> Result<T, RpcError> {
    node.text
        .trim()
        .parse()
        .map_err(|_| RpcError::Malformed(format!("bad <{}>: {:?}", node.name, node.text)))
}

fn parse_value(node: &Node) -> Result<Value, RpcError> {
    let Some(typed) = node.children.first() else {
        // An untyped <value> is a string.
        return Ok(Value::String(node.text.clone()));
    };

    let value = match typed.name.as_str() {
        "int" | "i4" | "i8" => Value::Int(parse_number(typed)?),
        "boolean" => Value::Bool(typed.text.trim() == "1"),
        "double" => Value::Double(parse_number(typed)?),
        "string" => Value::String(typed.text.clone()),
        "base64" => Value::Base64(typed.text.clone()),
        "dateTime.iso8601" => Value::DateTime(typed.text.trim().to_string()),
        "nil" => Value::Nil,
        "array" => {
            let data = typed.require("data")?;
            Value::Array(
                data.children
                    .iter()
                    .filter(|c| c.name == "value")
                    .map(parse_value)
                    .collect::<Result<_, _>>()?,
            )
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.require("name")?.text.clone();
                let value = parse_value(member.require("value")?)?;
                members.insert(name, value);
            }
            Value::Struct(members)
        }
        other => return Err(RpcError::Malformed(format!("unknown value type <{other}>"))),
    };
    Ok(value)
}

/// Parses a `methodResponse`, turning a fault into [`RpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, RpcError> {
    let document = parse_tree(xml)?;
    let response = document.require("methodResponse")?;

    if let Some(fault) = response.child("fault") {
        let fault = parse_value(fault.require("value")?)?;
        let code = match fault.get("faultCode") {
            Some(Value::Int(code)) => *code,
            _ => 0,
        };
        let message = fault.get_text("faultString").unwrap_or_default();
        return Err(RpcError::Fault { code, message });
    }

    let value = response
        .require("params")?
        .require("param")?
        .require("value")?;
    parse_value(value)
}
