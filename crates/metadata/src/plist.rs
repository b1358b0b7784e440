//! Minimal Apple property-list (XML flavour) reader and writer.

use std::io::{self, Write};

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::MetadataError;

const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<!DOCTYPE plist PUBLIC \"-//Apple Computer//DTD PLIST 1.0//EN\" ",
    "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
    "<plist version=\"1.0\">\n",
);

#[derive(Clone, Debug, PartialEq)]
pub enum PlistValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(String),
    Data(String),
    Array(Vec<PlistValue>),
    Dict(Vec<(String, PlistValue)>),
}

impl PlistValue {
    /// Dict lookup; the first entry wins when a key repeats.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        match self {
            PlistValue::Dict(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(text) | PlistValue::Date(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(value) => Some(*value),
            PlistValue::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(String, PlistValue)]> {
        match self {
            PlistValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }
}

enum Frame {
    Dict {
        entries: Vec<(String, PlistValue)>,
        key: Option<String>,
    },
    Array(Vec<PlistValue>),
    Leaf {
        tag: String,
        text: String,
    },
}

/// Parses a whole document and returns the value inside `<plist>`.
pub fn parse(xml: &[u8]) -> Result<PlistValue, MetadataError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<PlistValue> = None;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "plist" => {}
                    "dict" => stack.push(Frame::Dict {
                        entries: Vec::new(),
                        key: None,
                    }),
                    "array" => stack.push(Frame::Array(Vec::new())),
                    _ => stack.push(Frame::Leaf {
                        tag: name,
                        text: String::new(),
                    }),
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let value = match name.as_str() {
                    "plist" => continue,
                    "key" => {
                        set_key(&mut stack, String::new())?;
                        continue;
                    }
                    "dict" => PlistValue::Dict(Vec::new()),
                    "array" => PlistValue::Array(Vec::new()),
                    _ => leaf_value(&name, String::new())?,
                };
                attach(&mut stack, &mut root, value)?;
            }
            Event::Text(e) => {
                if let Some(Frame::Leaf { text, .. }) = stack.last_mut() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| MetadataError::Plist(err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if let Some(Frame::Leaf { text, .. }) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"plist" {
                    continue;
                }
                let value = match stack.pop() {
                    Some(Frame::Dict { entries, .. }) => PlistValue::Dict(entries),
                    Some(Frame::Array(items)) => PlistValue::Array(items),
                    Some(Frame::Leaf { tag, text }) => {
                        if tag == "key" {
                            set_key(&mut stack, text)?;
                            continue;
                        }
                        leaf_value(&tag, text)?
                    }
                    None => {
                        return Err(MetadataError::Plist(format!(
                            "unexpected closing tag at byte {}",
                            reader.buffer_position()
                        )))
                    }
                };
                attach(&mut stack, &mut root, value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MetadataError::Plist("document ended inside an element".to_string()));
    }
    root.ok_or_else(|| MetadataError::Plist("document holds no value".to_string()))
}

fn leaf_value(tag: &str, text: String) -> Result<PlistValue, MetadataError> {
    let value = match tag {
        "string" => PlistValue::String(text),
        "integer" => PlistValue::Integer(
            text.trim()
                .parse()
                .map_err(|_| MetadataError::Plist(format!("bad integer {:?}", text)))?,
        ),
        "real" => PlistValue::Real(
            text.trim()
                .parse()
                .map_err(|_| MetadataError::Plist(format!("bad real {:?}", text)))?,
        ),
        "date" => PlistValue::Date(text.trim().to_string()),
        "data" => PlistValue::Data(text.split_whitespace().collect()),
        "true" => PlistValue::Boolean(true),
        "false" => PlistValue::Boolean(false),
        other => return Err(MetadataError::Plist(format!("unknown element <{}>", other))),
    };
    Ok(value)
}

fn set_key(stack: &mut [Frame], name: String) -> Result<(), MetadataError> {
    match stack.last_mut() {
        Some(Frame::Dict { key, .. }) => {
            *key = Some(name);
            Ok(())
        }
        _ => Err(MetadataError::Plist(format!("key {:?} outside a dict", name))),
    }
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<PlistValue>,
    value: PlistValue,
) -> Result<(), MetadataError> {
    match stack.last_mut() {
        None => {
            if root.is_some() {
                return Err(MetadataError::Plist("more than one top-level value".to_string()));
            }
            *root = Some(value);
            Ok(())
        }
        Some(Frame::Dict { entries, key }) => match key.take() {
            Some(key) => {
                entries.push((key, value));
                Ok(())
            }
            None => Err(MetadataError::Plist("dict value without a key".to_string())),
        },
        Some(Frame::Array(items)) => {
            items.push(value);
            Ok(())
        }
        Some(Frame::Leaf { tag, .. }) => Err(MetadataError::Plist(format!(
            "<{}> cannot contain elements",
            tag
        ))),
    }
}

/// Streams a property list, one element per line, tab-indented.
pub struct PlistWriter<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> PlistWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn start_document(&mut self) -> io::Result<()> {
        self.out.write_all(HEADER.as_bytes())
    }

    pub fn end_document(&mut self) -> io::Result<()> {
        self.out.write_all(b"</plist>\n")?;
        self.out.flush()
    }

    pub fn begin_dict(&mut self) -> io::Result<()> {
        self.line("<dict>")?;
        self.depth += 1;
        Ok(())
    }

    pub fn end_dict(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.line("</dict>")
    }

    pub fn key(&mut self, key: &str) -> io::Result<()> {
        self.line(&format!("<key>{}</key>", escape(key)))
    }

    pub fn string(&mut self, value: &str) -> io::Result<()> {
        self.line(&format!("<string>{}</string>", escape(value)))
    }

    pub fn integer(&mut self, value: i64) -> io::Result<()> {
        self.line(&format!("<integer>{}</integer>", value))
    }

    pub fn date(&mut self, value: &str) -> io::Result<()> {
        self.line(&format!("<date>{}</date>", escape(value)))
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        for _ in 0..self.depth {
            self.out.write_all(b"\t")?;
        }
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(b"\n")
    }
}
