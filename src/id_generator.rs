use crate::dom::{HtmlDomElement, HtmlDomParser};
use std::collections::HashSet;

/// Issues `<prefix>-<n>` ids for elements that have none.
///
/// One generator serves one processing pass. Ids seen in the document through
/// [`IdGenerator::reserve_existing`] are never handed out, so a generated id
/// cannot collide with an author-written one.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    counter: u64,
    generated: u64,
    reserved: HashSet<String>,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            generated: 0,
            reserved: HashSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of ids assigned so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn reserve(&mut self, id: impl Into<String>) {
        self.reserved.insert(id.into());
    }

    pub fn reserve_existing<P: HtmlDomParser>(&mut self, parser: &P) {
        for element in parser.find("[id]") {
            if let Some(id) = element.get_attribute("id") {
                if !id.is_empty() {
                    self.reserved.insert(id);
                }
            }
        }
    }

    pub fn generate_id<E: HtmlDomElement>(&mut self, element: &E) {
        let has_id = element
            .get_attribute("id")
            .map(|id| !id.is_empty())
            .unwrap_or(false);
        if has_id {
            return;
        }
        let id = self.next_id();
        element.set_attribute("id", &id);
        self.generated = self.generated.saturating_add(1);
    }

    fn next_id(&mut self) -> String {
        loop {
            self.counter += 1;
            let candidate = format!("{}-{}", self.prefix, self.counter);
            if self.reserved.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
