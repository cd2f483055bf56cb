//! SOAP request envelopes for the Partner API

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};
use std::fmt::Display;

use crate::error::TransportError;
use crate::transport::{IdBatch, RecordBatch};

const NAMESPACES: [(&str, &str); 5] = [
    ("xmlns:xsd", "http://www.w3.org/2001/XMLSchema"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    ("xmlns:env", "http://schemas.xmlsoap.org/soap/envelope/"),
    ("xmlns:urn", "urn:partner.soap.sforce.com"),
    ("xmlns:sf", "urn:sobject.partner.soap.sforce.com"),
];

type Result<T> = std::result::Result<T, TransportError>;

/// An envelope being written, positioned inside `env:Body`
struct Envelope {
    writer: Writer<Vec<u8>>,
}

impl Envelope {
    fn open(session_id: Option<&str>) -> Result<Self> {
        let mut envelope = Self {
            writer: Writer::new(Vec::new()),
        };

        envelope.write(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        envelope.write(Event::Start(
            BytesStart::new("env:Envelope").with_attributes(NAMESPACES),
        ))?;

        if let Some(session_id) = session_id {
            envelope.start("env:Header")?;
            envelope.start("urn:SessionHeader")?;
            envelope.text_element("urn:sessionId", session_id)?;
            envelope.end("urn:SessionHeader")?;
            envelope.end("env:Header")?;
        }

        envelope.start("env:Body")?;
        Ok(envelope)
    }

    fn finish(mut self) -> Result<String> {
        self.end("env:Body")?;
        self.end("env:Envelope")?;
        String::from_utf8(self.writer.into_inner()).map_err(xml_error)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_error)
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }
}

fn xml_error(err: impl Display) -> TransportError {
    TransportError::new(format!("Failed to write SOAP envelope: {}", err))
}

pub(crate) fn login(username: &str, password: &str) -> Result<String> {
    let mut envelope = Envelope::open(None)?;
    envelope.start("urn:login")?;
    envelope.text_element("urn:username", username)?;
    envelope.text_element("urn:password", password)?;
    envelope.end("urn:login")?;
    envelope.finish()
}

pub(crate) fn query_all(session_id: &str, statement: &str) -> Result<String> {
    let mut envelope = Envelope::open(Some(session_id))?;
    envelope.start("urn:queryAll")?;
    envelope.text_element("urn:queryString", statement)?;
    envelope.end("urn:queryAll")?;
    envelope.finish()
}

pub(crate) fn create(session_id: &str, batch: &RecordBatch) -> Result<String> {
    save("urn:create", session_id, batch)
}

pub(crate) fn update(session_id: &str, batch: &RecordBatch) -> Result<String> {
    save("urn:update", session_id, batch)
}

pub(crate) fn delete(session_id: &str, batch: &IdBatch) -> Result<String> {
    let mut envelope = Envelope::open(Some(session_id))?;
    envelope.start("urn:delete")?;
    for id in &batch.ids {
        envelope.text_element("urn:ids", id)?;
    }
    envelope.end("urn:delete")?;
    envelope.finish()
}

fn save(operation: &str, session_id: &str, batch: &RecordBatch) -> Result<String> {
    let mut envelope = Envelope::open(Some(session_id))?;
    envelope.start(operation)?;
    for record in &batch.records {
        envelope.start("urn:sObjects")?;
        envelope.text_element("sf:type", &batch.object_type)?;
        write_fields(&mut envelope, record)?;
        envelope.end("urn:sObjects")?;
    }
    envelope.end(operation)?;
    envelope.finish()
}

fn write_fields(envelope: &mut Envelope, record: &Map<String, Value>) -> Result<()> {
    for (name, value) in record {
        write_field(envelope, name, value)?;
    }
    Ok(())
}

/// Write one sObject field; arrays repeat the element, nulls are omitted
fn write_field(envelope: &mut Envelope, name: &str, value: &Value) -> Result<()> {
    if !is_field_name(name) {
        return Err(TransportError::new(format!(
            "'{}' is not a valid sObject field name",
            name
        )));
    }

    let element = format!("sf:{}", name);
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| write_field(envelope, name, item)),
        Value::Object(fields) => {
            envelope.start(&element)?;
            write_fields(envelope, fields)?;
            envelope.end(&element)
        }
        Value::String(text) => envelope.text_element(&element, text),
        Value::Bool(_) | Value::Number(_) => envelope.text_element(&element, &value.to_string()),
    }
}

/// API names start with a letter and contain only letters, digits and `_`
fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
