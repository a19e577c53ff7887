//! Tests for shared vocabulary types

use order_dispatch::util::PriorityClass;

#[test]
fn test_priority_serde_names() {
    assert_eq!(serde_json::to_string(&PriorityClass::High).unwrap(), "\"HIGH\"");
    assert_eq!(serde_json::to_string(&PriorityClass::Normal).unwrap(), "\"NORMAL\"");

    let vip: PriorityClass = serde_json::from_str("\"VIP\"").unwrap();
    assert_eq!(vip, PriorityClass::High);
    assert!(serde_json::from_str::<PriorityClass>("\"URGENT\"").is_err());
}

#[test]
fn test_priority_labels() {
    assert_eq!(PriorityClass::High.to_string(), "VIP");
    assert_eq!(PriorityClass::Normal.to_string(), "Normal");
}
