//! The process-wide schedule provider
//!
//! Kept in its own test binary since swapping the provider is global.

use heroes_core::core::types::Timestamp;
use heroes_core::data::template::InlineTemplateSource;
use heroes_core::schedule::{
    default_provider, set_default_provider, FixedScheduleProvider, ScheduleProvider, Timeline,
};
use heroes_core::unit::Unit;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_default_provider_lifecycle() {
    // Without any setup the default provider hands out one shared auto timeline
    let mut a = Unit::new(InlineTemplateSource::from_json("Scout", json!({})));
    let mut b = Unit::new(InlineTemplateSource::from_json("Scout", json!({})));
    let first = a.outcome(json!(null), None).timestamp();
    let second = b.outcome(json!(null), None).timestamp();
    assert!(second > first);
    assert!(Arc::ptr_eq(&a.schedule(), &b.schedule()));
    assert!(Arc::ptr_eq(&default_provider().schedule(true), &a.schedule()));

    // Swapping only affects units resolving their schedule afterwards
    let replay = Arc::new(Timeline::manual());
    replay.advance_to(Timestamp(1000));
    let previous = set_default_provider(Arc::new(FixedScheduleProvider::new(replay.clone())));
    assert!(previous.is_some());

    let mut late = Unit::new(InlineTemplateSource::from_json("Scout", json!({})));
    assert_eq!(late.outcome(json!(null), None).timestamp(), Timestamp(1000));
    assert!(a.outcome(json!(null), None).timestamp() < Timestamp(1000));
}
