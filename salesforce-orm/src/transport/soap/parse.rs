//! SOAP response parsing
//!
//! Converts Partner API responses into the JSON shapes the ORM core expects.
//! Records become objects keyed by field name, with the sObject type moved
//! under `attributes`.

use roxmltree::{Document, Node};
use serde_json::{Map, Value, json};

use crate::error::TransportError;

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Server endpoint and session id returned by `login`
#[derive(Clone)]
pub(crate) struct LoginResult {
    pub server_url: String,
    pub session_id: String,
}

pub(crate) fn login_result(xml: &str) -> Result<LoginResult, TransportError> {
    let doc = parse_document(xml)?;
    let results = operation_results(&doc, "login")?;
    let result = results
        .first()
        .ok_or_else(|| TransportError::new("login response has no result"))?;

    let server_url = child_text(*result, "serverUrl")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TransportError::new("login response has no serverUrl"))?;
    let session_id = child_text(*result, "sessionId")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TransportError::new("login response has no sessionId"))?;

    Ok(LoginResult {
        server_url: server_url.to_string(),
        session_id: session_id.to_string(),
    })
}

/// Parse a `queryAll` response into `{"result": {"done", "size", "records"}}`
pub(crate) fn query_result(xml: &str) -> Result<Value, TransportError> {
    let doc = parse_document(xml)?;
    let results = operation_results(&doc, "queryAll")?;
    let result = results
        .first()
        .ok_or_else(|| TransportError::new("queryAll response has no result"))?;

    Ok(json!({ "result": query_result_to_json(*result) }))
}

/// Parse a create/update/delete response into `{"result": [{"id", "success", "errors"}]}`
pub(crate) fn save_results(xml: &str, operation: &str) -> Result<Value, TransportError> {
    let doc = parse_document(xml)?;
    let results: Vec<Value> = operation_results(&doc, operation)?
        .into_iter()
        .map(save_result_to_json)
        .collect();

    Ok(json!({ "result": results }))
}

fn parse_document(xml: &str) -> Result<Document<'_>, TransportError> {
    Document::parse(xml).map_err(|e| TransportError::new(format!("invalid SOAP response: {}", e)))
}

/// Collect the `result` elements of `<{operation}Response>`, or the fault
fn operation_results<'a, 'input>(
    doc: &'a Document<'input>,
    operation: &str,
) -> Result<Vec<Node<'a, 'input>>, TransportError> {
    let body = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Body")
        .ok_or_else(|| TransportError::new("SOAP response has no Body"))?;

    if let Some(fault) = element_child(body, "Fault") {
        let code = child_text(fault, "faultcode").unwrap_or_default();
        let message = child_text(fault, "faultstring").unwrap_or("SOAP fault");
        return Err(TransportError::new(message)
            .with_payload(json!({"faultcode": code, "faultstring": message})));
    }

    let response_name = format!("{}Response", operation);
    let response = element_child(body, &response_name)
        .ok_or_else(|| TransportError::new(format!("SOAP response has no {}", response_name)))?;

    Ok(element_children(response, "result").collect())
}

fn query_result_to_json(node: Node) -> Value {
    let mut result = Map::new();

    let done = child_text(node, "done") == Some("true");
    result.insert("done".to_string(), Value::Bool(done));

    if let Some(size) = child_text(node, "size").and_then(|s| s.parse::<i64>().ok()) {
        result.insert("size".to_string(), json!(size));
    }
    if let Some(locator) = child_text(node, "queryLocator").filter(|s| !s.is_empty()) {
        result.insert("queryLocator".to_string(), json!(locator));
    }

    let records: Vec<Value> = element_children(node, "records").map(record_to_json).collect();
    result.insert("records".to_string(), Value::Array(records));

    Value::Object(result)
}

fn record_to_json(node: Node) -> Value {
    let mut record = Map::new();

    for child in node.children().filter(Node::is_element) {
        let name = child.tag_name().name();
        match name {
            "type" => {
                record.insert("attributes".to_string(), json!({"type": child.text().unwrap_or_default()}));
            }
            // The Partner API repeats Id; keep the first non-empty one
            "Id" => {
                let has_id = record
                    .get("Id")
                    .and_then(Value::as_str)
                    .is_some_and(|id| !id.is_empty());
                if !has_id {
                    record.insert("Id".to_string(), element_value(child));
                }
            }
            _ => {
                record.insert(name.to_string(), element_value(child));
            }
        }
    }

    Value::Object(record)
}

fn element_value(node: Node) -> Value {
    if node.attribute((XSI_NS, "nil")) == Some("true") {
        return Value::Null;
    }

    if !node.children().any(|c| c.is_element()) {
        return Value::String(node.text().unwrap_or_default().to_string());
    }

    // Child relationship subquery
    if element_child(node, "done").is_some() {
        return query_result_to_json(node);
    }

    record_to_json(node)
}

fn save_result_to_json(node: Node) -> Value {
    let id = child_text(node, "id")
        .filter(|id| !id.is_empty())
        .map(|id| Value::String(id.to_string()))
        .unwrap_or(Value::Null);
    let success = child_text(node, "success") == Some("true");

    let errors: Vec<Value> = element_children(node, "errors")
        .map(|error| {
            let fields: Vec<&str> = element_children(error, "fields")
                .filter_map(|f| f.text())
                .collect();
            json!({
                "statusCode": child_text(error, "statusCode"),
                "message": child_text(error, "message"),
                "fields": fields,
            })
        })
        .collect();

    json!({"id": id, "success": success, "errors": errors})
}

fn element_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn element_children<'a, 'input, 'n>(
    node: Node<'a, 'input>,
    name: &'n str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'n
where
    'a: 'n,
    'input: 'n,
{
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child_text<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<&'a str> {
    element_child(node, name).map(|n| n.text().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE_START: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:sf="urn:sobject.partner.soap.sforce.com"><soapenv:Body>"#;
    const ENVELOPE_END: &str = "</soapenv:Body></soapenv:Envelope>";

    fn wrap(body: &str) -> String {
        format!("{}{}{}", ENVELOPE_START, body, ENVELOPE_END)
    }

    #[test]
    fn test_login_result() {
        let xml = wrap(
            "<loginResponse><result>\
             <passwordExpired>false</passwordExpired>\
             <serverUrl>https://acme.my.salesforce.com/services/Soap/u/59.0/00Dxx</serverUrl>\
             <sessionId>00Dxx!AQ0AQ</sessionId>\
             </result></loginResponse>",
        );

        let result = login_result(&xml).unwrap();
        assert_eq!(
            result.server_url,
            "https://acme.my.salesforce.com/services/Soap/u/59.0/00Dxx"
        );
        assert_eq!(result.session_id, "00Dxx!AQ0AQ");
    }

    #[test]
    fn test_fault_becomes_transport_error() {
        let xml = wrap(
            "<soapenv:Fault><faultcode>INVALID_LOGIN</faultcode>\
             <faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>\
             </soapenv:Fault>",
        );

        let err = login_result(&xml).err().unwrap();
        assert!(err.message.starts_with("INVALID_LOGIN"));
        assert_eq!(err.payload.unwrap()["faultcode"], "INVALID_LOGIN");
    }

    #[test]
    fn test_query_result_records() {
        let xml = wrap(
            r#"<queryAllResponse><result xsi:type="QueryResult">
               <done>true</done><queryLocator xsi:nil="true"/>
               <records xsi:type="sf:sObject">
                 <sf:type>Account</sf:type><sf:Id>001A</sf:Id><sf:Id>001A</sf:Id>
                 <sf:Name>Acme</sf:Name><sf:Industry xsi:nil="true"/>
                 <sf:Owner xsi:type="sf:sObject"><sf:type>User</sf:type><sf:Id xsi:nil="true"/><sf:Name>Jane</sf:Name></sf:Owner>
               </records>
               <records xsi:type="sf:sObject">
                 <sf:type>Account</sf:type><sf:Id>001B</sf:Id><sf:Name>Beta</sf:Name><sf:Industry>Tech</sf:Industry>
               </records>
               <size>2</size>
               </result></queryAllResponse>"#,
        );

        let value = query_result(&xml).unwrap();
        let result = &value["result"];

        assert_eq!(result["done"], json!(true));
        assert_eq!(result["size"], json!(2));
        assert_eq!(
            result["records"][0],
            json!({
                "attributes": {"type": "Account"},
                "Id": "001A",
                "Name": "Acme",
                "Industry": null,
                "Owner": {"attributes": {"type": "User"}, "Id": null, "Name": "Jane"}
            })
        );
        assert_eq!(result["records"][1]["Industry"], json!("Tech"));
    }

    #[test]
    fn test_query_result_not_done() {
        let xml = wrap(
            "<queryAllResponse><result><done>false</done>\
             <queryLocator>01gxx-2000</queryLocator><size>5000</size></result></queryAllResponse>",
        );

        let value = query_result(&xml).unwrap();
        assert_eq!(value["result"]["done"], json!(false));
        assert_eq!(value["result"]["queryLocator"], json!("01gxx-2000"));
        assert_eq!(value["result"]["records"], json!([]));
    }

    #[test]
    fn test_save_results() {
        let xml = wrap(
            "<createResponse>\
             <result><id>001A</id><success>true</success></result>\
             <result><id xsi:nil=\"true\"/><success>false</success>\
               <errors><fields>Name</fields><message>Required fields are missing: [Name]</message>\
               <statusCode>REQUIRED_FIELD_MISSING</statusCode></errors></result>\
             </createResponse>",
        );

        let value = save_results(&xml, "create").unwrap();
        assert_eq!(
            value,
            json!({"result": [
                {"id": "001A", "success": true, "errors": []},
                {"id": null, "success": false, "errors": [{
                    "statusCode": "REQUIRED_FIELD_MISSING",
                    "message": "Required fields are missing: [Name]",
                    "fields": ["Name"]
                }]}
            ]})
        );
    }

    #[test]
    fn test_missing_operation_response() {
        let xml = wrap("<updateResponse/>");
        let err = save_results(&xml, "create").unwrap_err();
        assert!(err.message.contains("createResponse"));
    }

    #[test]
    fn test_invalid_xml() {
        assert!(query_result("<html>Service Unavailable").is_err());
    }
}
