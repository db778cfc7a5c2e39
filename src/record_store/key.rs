use crate::error::Error;
use std::fmt;
use trust_dns_proto::op::{Message, Query};
use trust_dns_proto::rr::{Name, RecordType};

/// Canonical lookup key for a single DNS question.
///
/// Names are lower-cased and always carry the trailing root dot, so a query and the reply to
/// that query produce the same key regardless of how either spelled the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionKey {
    name: String,
    record_type: RecordType,
}

impl QuestionKey {
    #[must_use]
    pub fn new(name: &Name, record_type: RecordType) -> Self {
        let mut name = name.to_lowercase().to_ascii();
        if !name.ends_with('.') {
            name.push('.');
        }
        QuestionKey { name, record_type }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }
}

impl From<&Query> for QuestionKey {
    fn from(query: &Query) -> Self {
        QuestionKey::new(query.name(), query.query_type())
    }
}

impl TryFrom<&Message> for QuestionKey {
    type Error = Error;

    fn try_from(message: &Message) -> Result<Self, Self::Error> {
        match message.queries() {
            [query] => Ok(query.into()),
            queries => Err(Error::ContractViolation {
                questions: queries.len(),
            }),
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.record_type)
    }
}
