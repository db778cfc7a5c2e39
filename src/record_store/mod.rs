//! Exact-match reply storage.
//!
//! Tests register complete DNS reply messages keyed by their single question. The
//! [stub resolver][crate::dns] serves a stored reply verbatim whenever an incoming query asks the
//! same question, taking priority over the synthesized [`DefaultA`] answer.
//!
//! ```
//! use std::str::FromStr;
//! use testacme::record_store::RecordStore;
//! use trust_dns_proto::op::{Message, Query};
//! use trust_dns_proto::rr::rdata::TXT;
//! use trust_dns_proto::rr::{Name, RData, Record, RecordType};
//!
//! let name = Name::from_str("_acme-challenge.example.test.").unwrap();
//! let mut reply = Message::new();
//! reply
//!     .add_query(Query::query(name.clone(), RecordType::TXT))
//!     .add_answer(Record::from_rdata(
//!         name.clone(),
//!         60,
//!         RData::TXT(TXT::new(vec!["token".to_string()])),
//!     ));
//!
//! let store = RecordStore::default();
//! store.store(&reply).unwrap();
//! let found = store.lookup(&Query::query(name, RecordType::TXT)).unwrap();
//! assert_eq!(found.answers(), reply.answers());
//! ```

mod key;

use crate::error::Error;
use dashmap::DashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use trust_dns_proto::op::{Message, MessageType, Query};
use trust_dns_proto::rr::{Name, RData, Record};

pub use key::QuestionKey;

/// `SharedRecordStore` is a [`RecordStore`] shared between the resolver and test code. The store
/// synchronizes internally, so no further locking is needed.
#[allow(clippy::module_name_repetitions)]
pub type SharedRecordStore = Arc<RecordStore>;

/// Template for the `A` record synthesized for queries without an exact match.
///
/// The template's own name is a placeholder; it is always replaced by the queried name.
#[derive(Debug, Clone)]
pub struct DefaultA {
    template: Record,
}

impl DefaultA {
    #[must_use]
    pub fn new(addr: Ipv4Addr, ttl: u32) -> Self {
        DefaultA {
            template: Record::from_rdata(Name::root(), ttl, RData::A(addr)),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> u32 {
        self.template.ttl()
    }

    /// The template record renamed to `name`.
    #[must_use]
    pub fn record_for(&self, name: Name) -> Record {
        let mut record = self.template.clone();
        record.set_name(name);
        record
    }
}

impl Default for DefaultA {
    fn default() -> Self {
        DefaultA::new(Ipv4Addr::LOCALHOST, 1800)
    }
}

/// A concurrency-safe map of [`QuestionKey`] to stored reply [`Message`]s, plus the
/// [`DefaultA`] template used when nothing was stored.
///
/// Stored replies are copied in and copied out: mutating a message after storing it, or mutating
/// a looked-up reply, never changes what the store serves.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct RecordStore {
    replies: DashMap<QuestionKey, Message>,
    default_a: DefaultA,
}

impl RecordStore {
    #[must_use]
    pub fn new(default_a: DefaultA) -> Self {
        RecordStore {
            replies: DashMap::new(),
            default_a,
        }
    }

    #[must_use]
    pub fn default_a(&self) -> &DefaultA {
        &self.default_a
    }

    /// Store a copy of `message` for lookup by its question, replacing any prior reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] unless `message` has exactly one question.
    pub fn store(&self, message: &Message) -> Result<(), Error> {
        let key = QuestionKey::try_from(message)?;
        tracing::debug!("storing exact reply for {key}");
        self.replies.insert(key, message.clone());
        Ok(())
    }

    /// Remove the reply stored for `message`'s question. Removing an absent reply is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] unless `message` has exactly one question.
    pub fn remove(&self, message: &Message) -> Result<(), Error> {
        let key = QuestionKey::try_from(message)?;
        if self.replies.remove(&key).is_some() {
            tracing::debug!("removed exact reply for {key}");
        }
        Ok(())
    }

    /// A copy of the reply stored for `query`, if any.
    #[must_use]
    pub fn lookup(&self, query: &Query) -> Option<Message> {
        self.replies
            .get(&QuestionKey::from(query))
            .map(|reply| reply.value().clone())
    }

    /// A copy of the reply stored for the single question in `message`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] unless `message` has exactly one question.
    pub fn lookup_message(&self, message: &Message) -> Result<Option<Message>, Error> {
        let key = QuestionKey::try_from(message)?;
        Ok(self.replies.get(&key).map(|reply| reply.value().clone()))
    }

    /// A fresh reply answering `query` with the [`DefaultA`] record renamed to the queried name.
    #[must_use]
    pub fn default_answer(&self, query: &Query) -> Message {
        let mut reply = Message::new();
        reply
            .set_message_type(MessageType::Response)
            .add_query(query.clone())
            .add_answer(self.default_a.record_for(query.name().clone()));
        reply
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::thread;
    use trust_dns_proto::rr::rdata::TXT;
    use trust_dns_proto::rr::RecordType;

    fn txt_reply(name: &str, values: &[&str]) -> Message {
        let name = Name::from_str(name).unwrap();
        let mut reply = Message::new();
        reply
            .add_query(Query::query(name.clone(), RecordType::TXT))
            .add_answer(Record::from_rdata(
                name,
                300,
                RData::TXT(TXT::new(values.iter().map(ToString::to_string).collect())),
            ));
        reply
    }

    fn txt_query(name: &str) -> Query {
        Query::query(Name::from_str(name).unwrap(), RecordType::TXT)
    }

    #[test]
    fn store_then_lookup() {
        let store = RecordStore::default();
        let reply = txt_reply("a.test.", &["foo=bar", "baz=qux"]);
        store.store(&reply).unwrap();

        let found = store.lookup(&txt_query("a.test.")).unwrap();
        assert_eq!(found.answers(), reply.answers());
        assert!(store.lookup(&txt_query("b.test.")).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookup_ignores_case_and_trailing_dot() {
        let store = RecordStore::default();
        let reply = txt_reply("a.test.", &["v"]);
        store.store(&reply).unwrap();

        assert!(store.lookup(&txt_query("A.TEST")).is_some());
    }

    #[test]
    fn store_overwrites() {
        let store = RecordStore::default();
        store.store(&txt_reply("a.test.", &["old"])).unwrap();
        let newer = txt_reply("a.test.", &["new"]);
        store.store(&newer).unwrap();

        let found = store.lookup(&txt_query("a.test.")).unwrap();
        assert_eq!(found.answers(), newer.answers());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove() {
        let store = RecordStore::default();
        let reply = txt_reply("a.test.", &["v"]);
        store.store(&reply).unwrap();
        store.remove(&reply).unwrap();

        assert!(store.lookup(&txt_query("a.test.")).is_none());
        assert!(store.is_empty());
        // absent is a no-op
        store.remove(&reply).unwrap();
    }

    #[test]
    fn lookups_are_copies() {
        let store = RecordStore::default();
        let mut reply = txt_reply("a.test.", &["v"]);
        store.store(&reply).unwrap();
        let original = reply.answers().to_vec();

        reply.take_answers();
        let mut found = store.lookup(&txt_query("a.test.")).unwrap();
        assert_eq!(found.answers(), original.as_slice());

        found.take_answers();
        let again = store.lookup(&txt_query("a.test.")).unwrap();
        assert_eq!(again.answers(), original.as_slice());
    }

    #[test]
    fn single_question_contract() {
        let store = RecordStore::default();
        let empty = Message::new();
        assert!(matches!(
            store.store(&empty),
            Err(Error::ContractViolation { questions: 0 })
        ));
        assert!(matches!(
            store.remove(&empty),
            Err(Error::ContractViolation { questions: 0 })
        ));

        let mut double = txt_reply("a.test.", &["v"]);
        double.add_query(txt_query("b.test."));
        assert!(matches!(
            store.store(&double),
            Err(Error::ContractViolation { questions: 2 })
        ));
        assert!(matches!(
            store.lookup_message(&double),
            Err(Error::ContractViolation { questions: 2 })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn lookup_message() {
        let store = RecordStore::default();
        let reply = txt_reply("a.test.", &["v"]);
        store.store(&reply).unwrap();

        let mut query = Message::new();
        query.add_query(txt_query("a.test."));
        let found = store.lookup_message(&query).unwrap().unwrap();
        assert_eq!(found.answers(), reply.answers());
    }

    #[test]
    fn default_answer_renames_template() {
        let store = RecordStore::new(DefaultA::new(Ipv4Addr::new(127, 0, 0, 2), 42));
        let name = Name::from_str("anything.test.").unwrap();
        let reply = store.default_answer(&Query::query(name.clone(), RecordType::A));

        assert_eq!(reply.message_type(), MessageType::Response);
        assert_eq!(reply.answers().len(), 1);
        let answer = &reply.answers()[0];
        assert_eq!(
            *answer,
            Record::from_rdata(name, 42, RData::A(Ipv4Addr::new(127, 0, 0, 2)))
        );
        assert_eq!(answer.ttl(), 42);
        assert_eq!(answer.record_type(), RecordType::A);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let store = Arc::new(RecordStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    let name = format!("host{i}.test.");
                    let reply = txt_reply(&name, &["v"]);
                    for _ in 0..100 {
                        store.store(&reply).unwrap();
                        assert!(store.lookup(&txt_query(&name)).is_some());
                        store.remove(&reply).unwrap();
                    }
                    store.store(&reply).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
