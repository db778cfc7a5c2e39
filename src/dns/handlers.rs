use crate::error::Error;
use crate::record_store::SharedRecordStore;
use std::sync::Arc;
use tracing::error;
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, Query, ResponseCode};
use trust_dns_server::client::rr::{Record, RecordType};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

/// What the stub resolver decided to answer for a single question.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A stored reply asked the same question; its answers are served as-is.
    ExactMatch(Vec<Record>),
    /// An `A` question without a stored reply, answered from the
    /// [`DefaultA`][crate::record_store::DefaultA] template.
    DefaultA(Vec<Record>),
    /// An `AAAA` question without a stored reply. IPv6 is never synthesized.
    Negative,
    /// Anything else goes to the [`UnhandledQuery`] delegate.
    Unsupported,
}

/// Delegate invoked for queries the stub resolver makes no decision about.
#[async_trait::async_trait]
pub trait UnhandledQuery: Send + Sync + 'static {
    async fn handle_unhandled<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> Result<ResponseInfo, Error>;
}

/// The default [`UnhandledQuery`] delegate: answers `NOTIMP`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplemented;

#[async_trait::async_trait]
impl UnhandledQuery for NotImplemented {
    async fn handle_unhandled<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }
}

/// Stub resolver request handler, answering from a [`SharedRecordStore`].
pub struct Handler<U = NotImplemented> {
    store: SharedRecordStore,
    unhandled: Arc<U>,
}

impl<U> Clone for Handler<U> {
    fn clone(&self) -> Self {
        Handler {
            store: self.store.clone(),
            unhandled: self.unhandled.clone(),
        }
    }
}

impl<U: UnhandledQuery> Handler<U> {
    pub fn new(store: SharedRecordStore, unhandled: U) -> Self {
        Handler {
            store,
            unhandled: Arc::new(unhandled),
        }
    }

    /// Decide how to answer `query`. Stored replies always win, then `A` synthesis, then the
    /// `AAAA` negative answer.
    pub fn decide(&self, query: &Query) -> Decision {
        if let Some(reply) = self.store.lookup(query) {
            return Decision::ExactMatch(reply.answers().to_vec());
        }
        match query.query_type() {
            RecordType::A => Decision::DefaultA(self.store.default_answer(query).take_answers()),
            RecordType::AAAA => Decision::Negative,
            _ => Decision::Unsupported,
        }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.unhandled.handle_unhandled(request, response_handle).await;
        }

        let query = request.query().original();
        let decision = self.decide(query);
        tracing::debug!(
            "{} {} from {}: {decision:?}",
            query.name(),
            query.query_type(),
            request.src()
        );
        match decision {
            Decision::ExactMatch(answers) | Decision::DefaultA(answers) => {
                self.send_answers(request, response_handle, answers).await
            }
            Decision::Negative => self.send_nxdomain(request, response_handle).await,
            Decision::Unsupported => {
                self.unhandled
                    .handle_unhandled(request, response_handle)
                    .await
            }
        }
    }

    async fn send_answers<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        answers: Vec<Record>,
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(header, answers.iter(), &[], &[], &[]);
        Ok(response_handle.send_response(response).await?)
    }

    async fn send_nxdomain<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(ResponseCode::NXDomain);
        let response = builder.build_no_records(header);
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl<U: UnhandledQuery> RequestHandler for Handler<U> {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::{DefaultA, RecordStore};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;
    use trust_dns_server::client::op::Message;
    use trust_dns_server::client::rr::rdata::TXT;
    use trust_dns_server::client::rr::{Name, RData};

    fn handler() -> (SharedRecordStore, Handler) {
        let store = Arc::new(RecordStore::new(DefaultA::new(Ipv4Addr::LOCALHOST, 1800)));
        (store.clone(), Handler::new(store, NotImplemented))
    }

    fn name(n: &str) -> Name {
        Name::from_str(n).unwrap()
    }

    fn reply(query: Query, answer: Record) -> Message {
        let mut reply = Message::new();
        reply.add_query(query).add_answer(answer);
        reply
    }

    #[test]
    fn exact_match() {
        let (store, handler) = handler();
        let answer = Record::from_rdata(
            name("a.test."),
            60,
            RData::TXT(TXT::new(vec!["foo=bar".to_string(), "baz=qux".to_string()])),
        );
        let query = Query::query(name("a.test."), RecordType::TXT);
        store.store(&reply(query.clone(), answer.clone())).unwrap();

        assert_eq!(handler.decide(&query), Decision::ExactMatch(vec![answer]));
    }

    #[test]
    fn exact_match_wins_over_default_a() {
        let (store, handler) = handler();
        let query = Query::query(name("pinned.test."), RecordType::A);
        let answer = Record::from_rdata(
            name("pinned.test."),
            60,
            RData::A(Ipv4Addr::new(10, 1, 2, 3)),
        );
        store.store(&reply(query.clone(), answer.clone())).unwrap();

        assert_eq!(handler.decide(&query), Decision::ExactMatch(vec![answer]));
    }

    #[test]
    fn exact_match_wins_over_negative() {
        let (store, handler) = handler();
        let query = Query::query(name("v6.test."), RecordType::AAAA);
        let answer = Record::from_rdata(name("v6.test."), 60, RData::AAAA(Ipv6Addr::LOCALHOST));
        store.store(&reply(query.clone(), answer.clone())).unwrap();

        assert_eq!(handler.decide(&query), Decision::ExactMatch(vec![answer]));
    }

    #[test]
    fn default_a() {
        let (_, handler) = handler();
        let query = Query::query(name("can.literally.be.anything."), RecordType::A);

        match handler.decide(&query) {
            Decision::DefaultA(answers) => {
                assert_eq!(
                    answers,
                    vec![Record::from_rdata(
                        name("can.literally.be.anything."),
                        1800,
                        RData::A(Ipv4Addr::LOCALHOST)
                    )]
                );
                assert_eq!(answers[0].ttl(), 1800);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn aaaa_is_negative() {
        let (_, handler) = handler();
        let query = Query::query(name("anything.test."), RecordType::AAAA);
        assert_eq!(handler.decide(&query), Decision::Negative);
    }

    #[test]
    fn other_types_are_unsupported() {
        let (_, handler) = handler();
        for record_type in [RecordType::TXT, RecordType::MX, RecordType::SOA, RecordType::NS] {
            let query = Query::query(name("anything.test."), record_type);
            assert_eq!(handler.decide(&query), Decision::Unsupported, "{record_type}");
        }
    }

    #[test]
    fn removed_reply_falls_back() {
        let (store, handler) = handler();
        let query = Query::query(name("a.test."), RecordType::TXT);
        let stored = reply(
            query.clone(),
            Record::from_rdata(name("a.test."), 60, RData::TXT(TXT::new(vec!["v".into()]))),
        );
        store.store(&stored).unwrap();
        store.remove(&stored).unwrap();

        assert_eq!(handler.decide(&query), Decision::Unsupported);
    }
}
