// Licensed under the Apache-2.0 license.

/// One element of a parsed document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Adds an attribute, replacing any previous value for `key`.
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.retain(|(k, _)| k != key);
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the decoded value of attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes()
            .find(|&(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Iterates over every element tagged `tag` in document order, starting
    /// with `self`.
    pub fn descendants<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            while let Some(elem) = stack.pop() {
                stack.extend(elem.children().iter().rev());
                if elem.tag() == tag {
                    return Some(elem);
                }
            }
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_preorder() {
        let root = Element::new("register")
            .with_attr("id", "outer")
            .with_child(
                Element::new("bitfield")
                    .with_attr("id", "a")
                    .with_child(Element::new("bitfield").with_attr("id", "nested")),
            )
            .with_child(Element::new("bitfield").with_attr("id", "b"));

        let ids: Vec<_> = root
            .descendants("bitfield")
            .filter_map(|e| e.attr("id"))
            .collect();
        assert_eq!(ids, ["a", "nested", "b"]);

        // The element itself is included when its tag matches.
        assert_eq!(root.descendants("register").count(), 1);
    }

    #[test]
    fn test_with_attr_replaces() {
        let elem = Element::new("x").with_attr("id", "1").with_attr("id", "2");
        assert_eq!(elem.attr("id"), Some("2"));
        assert_eq!(elem.attributes().count(), 1);
        assert_eq!(elem.attr("missing"), None);
    }
}
