use super::*;

#[test]
fn parse_frame_with_msg_alias() {
    let text = r#"{
        "topic": "org.fedoraproject.prod.bodhi.update.request.testing",
        "msg": {"update": {"title": "foo-1.0-1.fc40"}},
        "timestamp": 1700000000.0
    }"#;
    let message = FedmsgConsumer::parse_frame(text).unwrap();
    assert_eq!(
        message.topic,
        "org.fedoraproject.prod.bodhi.update.request.testing"
    );
    assert_eq!(message.body["update"]["title"], "foo-1.0-1.fc40");
    assert!(message.timestamp.is_some());
}

#[test]
fn parse_frame_without_timestamp() {
    let text = r#"{"topic": "org.fedoraproject.prod.planet.post.new", "body": {}}"#;
    let message = FedmsgConsumer::parse_frame(text).unwrap();
    assert_eq!(message.topic, "org.fedoraproject.prod.planet.post.new");
    assert!(message.timestamp.is_none());
}

#[test]
fn parse_frame_rejects_garbage() {
    assert!(FedmsgConsumer::parse_frame("not json").is_err());
    assert!(FedmsgConsumer::parse_frame(r#"{"msg": {}}"#).is_err());
}

#[test]
fn backoff_grows_and_caps() {
    assert_eq!(FedmsgConsumer::backoff_duration(1), BASE_BACKOFF);
    assert_eq!(FedmsgConsumer::backoff_duration(2), BASE_BACKOFF * 2);
    assert_eq!(FedmsgConsumer::backoff_duration(20), MAX_BACKOFF);
}
