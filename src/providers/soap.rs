use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" "#,
    r#"xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
);

/// Builds a SOAP 1.1 request calling `function` with `params` as child
/// elements, in order.
pub fn envelope(endpoint: &str, function: &str, params: &[(&str, &str)]) -> String {
    let params: String = params
        .iter()
        .map(|(name, value)| format!("<{name}>{}</{name}>", escape(*value)))
        .collect();
    format!(
        "{ENVELOPE_OPEN}xmlns:ns1=\"{endpoint}\">\
         <SOAP-ENV:Body SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
         <ns1:{function}>{params}</ns1:{function}></SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

/// Minimal element tree of a response, keyed by local names.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    /// Parses a document; the returned element is a synthetic root holding
    /// the document element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack = vec![Element::default()];
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Element::named(start.local_name().as_ref())),
                Event::Empty(empty) => {
                    let element = Element::named(empty.local_name().as_ref());
                    current(&mut stack)?.children.push(element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(unbalanced)?;
                    current(&mut stack)?.children.push(element);
                }
                Event::Text(text) => current(&mut stack)?.text.push_str(&text.unescape()?),
                Event::CData(data) => current(&mut stack)?
                    .text
                    .push_str(&String::from_utf8_lossy(&data.into_inner())),
                Event::Eof => break,
                _ => {}
            }
        }

        match stack.pop() {
            Some(root) if stack.is_empty() => Ok(root),
            _ => Err(unbalanced()),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.as_str())
    }

    /// First element named `name` anywhere below this one, depth first.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.descendant(name)
            }
        })
    }

    /// Follows `path` from the first descendant named `path[0]`.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.descendant(first)?, |element, name| element.child(name))
    }

    /// Every element matching `path` under any descendant named `path[0]`.
    pub fn find_all(&self, path: &[&str]) -> Vec<&Element> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut starts = Vec::new();
        self.collect_descendants(first, &mut starts);

        let mut level = starts;
        for name in rest {
            level = level
                .into_iter()
                .flat_map(|element| element.children.iter().filter(|c| c.name == *name))
                .collect();
        }
        level
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }
}

fn current(stack: &mut [Element]) -> Result<&mut Element> {
    stack.last_mut().ok_or_else(unbalanced)
}

fn unbalanced() -> Error {
    Error::ParseResponse("Unbalanced XML response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns1="urn:bsp">
  <SOAP-ENV:Body>
    <ns1:searchSubtitlesResponse>
      <return>
        <result><status>OK</status></result>
        <data>
          <item><subID>1</subID><subName>One &amp; Two</subName></item>
          <item><subID>2</subID><subName><![CDATA[Three]]></subName></item>
        </data>
      </return>
    </ns1:searchSubtitlesResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

    #[test]
    fn test_envelope_contains_function_and_params() {
        let body = envelope(
            "http://s1.example/v1.php",
            "logOut",
            &[("handle", "tok<en>")],
        );
        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<SOAP-ENV:Envelope"));
        assert!(body.contains("xmlns:ns1=\"http://s1.example/v1.php\">"));
        assert!(body.contains("<ns1:logOut><handle>tok&lt;en&gt;</handle></ns1:logOut>"));
        assert!(body.ends_with("</SOAP-ENV:Body></SOAP-ENV:Envelope>"));
    }

    #[test]
    fn test_find_by_local_names() {
        let root = Element::parse(SEARCH_RESPONSE).unwrap();
        let status = root.find(&["return", "result", "status"]).unwrap();
        assert_eq!(status.text, "OK");
        assert!(root.find(&["return", "status"]).is_none());

        let items = root.find_all(&["return", "data", "item"]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].child_text("subName"), Some("One & Two"));
        assert_eq!(items[1].child_text("subName"), Some("Three"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(Element::parse("<return><status>OK</return>").is_err());
    }
}
