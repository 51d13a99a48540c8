use snare::prelude::*;
use std::sync::Mutex;

#[derive(Default)]
struct Widget {
    seen: Mutex<Vec<(String, &'static str)>>,
}

impl Widget {
    fn seen(&self) -> Vec<(String, &'static str)> {
        self.seen.lock().unwrap().clone()
    }
}

fn record(exception: &Exception, receiver: Receiver<'_, Widget>) {
    let widget = receiver.instance().expect("handler expects an instance");
    widget
        .seen
        .lock()
        .unwrap()
        .push((exception.to_string(), exception.category().name()));
}

fn record_fallback(exception: &Exception, receiver: Receiver<'_, Widget>) {
    let widget = receiver.instance().expect("handler expects an instance");
    widget
        .seen
        .lock()
        .unwrap()
        .push((format!("fallback {exception}"), exception.category().name()));
}

static STORAGE_ERROR: Category = Category::new("StorageError", &ERROR);
static QUOTA_EXCEEDED: Category = Category::new("QuotaExceeded", &STORAGE_ERROR);

#[derive(Debug, thiserror::Error)]
#[error("page {0} is out of range")]
struct PageOutOfRange(u32);

impl Categorized for PageOutOfRange {
    fn category(&self) -> &'static Category {
        &RANGE_ERROR
    }
}

fn never_called(_: &Exception, _: Receiver<'_, Widget>) {
    panic!("inner registration must not match");
}

impl Widget {
    #[catch(REFERENCE_ERROR, record)]
    fn reference_failure(&self) -> Result<&'static str, Exception> {
        raise!(REFERENCE_ERROR, "Error here")
    }

    #[catch(REFERENCE_ERROR, record)]
    fn succeeds(&self) -> Result<&'static str, Exception> {
        Ok("Test")
    }

    #[catch(REFERENCE_ERROR, record)]
    fn type_failure(&self) -> Result<&'static str, Exception> {
        raise!(TYPE_ERROR, "wrong type")
    }

    #[catch(REFERENCE_ERROR, record)]
    #[catch(TYPE_ERROR, record)]
    fn chained_type_failure(&self) -> Result<(), Exception> {
        raise!(TYPE_ERROR, "Error here")
    }

    #[catch(REFERENCE_ERROR, record)]
    #[catch(TYPE_ERROR, never_called)]
    fn chained_reference_failure(&self) -> Result<(), Exception> {
        raise!(REFERENCE_ERROR, "Error here")
    }

    #[catch_all(record)]
    fn any_failure(&self) -> Result<(), Exception> {
        raise!(REFERENCE_ERROR, "Error here")
    }

    #[catch_all(record_fallback)]
    #[catch(TYPE_ERROR, record)]
    fn unregistered_failure(&self) -> Result<(), Exception> {
        raise!(REFERENCE_ERROR, "Error here")
    }

    #[catch(REFERENCE_ERROR, record)]
    async fn async_rejection(&self) -> Result<&'static str, Exception> {
        let pending = async { Err::<(), _>(Exception::new(&REFERENCE_ERROR, "Error here")) };
        pending.await?;
        Ok("Test")
    }

    #[catch(REFERENCE_ERROR, record)]
    async fn async_raise(&self) -> Result<&'static str, Exception> {
        raise!(REFERENCE_ERROR, "Error here")
    }

    #[catch(REFERENCE_ERROR, record)]
    async fn async_unmatched(&self) -> Result<&'static str, Exception> {
        tokio::task::yield_now().await;
        raise!(RANGE_ERROR, "out of range")
    }

    #[catch(REFERENCE_ERROR, record)]
    fn with_arguments(&self, numerator: i32, denominator: i32) -> Result<i32, Exception> {
        if denominator == 0 {
            raise!(REFERENCE_ERROR, "{numerator}/0");
        }
        Ok(numerator / denominator)
    }

    #[catch(TYPE_ERROR, record)]
    fn from_anyhow(&self) -> anyhow::Result<u8> {
        anyhow::bail!(Exception::new(&TYPE_ERROR, "wrapped"))
    }

    #[catch(RANGE_ERROR, record)]
    fn page(&self, number: u32) -> anyhow::Result<u32> {
        if number > 10 {
            anyhow::bail!(PageOutOfRange(number));
        }
        Ok(number)
    }

    #[catch(STORAGE_ERROR, record)]
    fn store(&self, bytes: usize) -> Result<usize, Exception> {
        match bytes {
            0 => raise!(STORAGE_ERROR, "nothing to store"),
            1..=1024 => Ok(bytes),
            _ => raise!(QUOTA_EXCEEDED, "{bytes} bytes over quota"),
        }
    }

    #[catch(QUOTA_EXCEEDED, never_called)]
    fn store_unchecked(&self) -> Result<usize, Exception> {
        raise!(STORAGE_ERROR, "disk offline")
    }

    #[catch(TYPE_ERROR, |_, _| -> Result<(), Exception> {
        Err(Exception::new(&RANGE_ERROR, "handler failed"))
    })]
    fn failing_handler(&self) -> Result<(), Exception> {
        raise!(TYPE_ERROR, "original")
    }

    #[catch(RANGE_ERROR, record)]
    #[catch(TYPE_ERROR, |_, _| -> Result<(), Exception> {
        Err(Exception::new(&RANGE_ERROR, "handler failed"))
    })]
    fn failing_handler_caught_outside(&self) -> Result<(), Exception> {
        raise!(TYPE_ERROR, "original")
    }
}

#[test]
fn test_handler_called_with_exception_and_receiver() {
    let widget = Widget::default();

    assert_eq!(widget.reference_failure().unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![("ReferenceError: Error here".to_string(), "ReferenceError")]
    );
}

#[test]
fn test_success_returns_value() {
    let widget = Widget::default();

    assert_eq!(widget.succeeds().unwrap(), Some("Test"));
    assert!(widget.seen().is_empty());
}

#[test]
fn test_unmatched_exception_propagates_unchanged() {
    let widget = Widget::default();

    let exception = widget.type_failure().unwrap_err();
    assert_eq!(exception.category(), &TYPE_ERROR);
    assert_eq!(exception.to_string(), "TypeError: wrong type");
    assert!(widget.seen().is_empty());
}

#[test]
fn test_chained_registrations_pick_the_matching_one() {
    let widget = Widget::default();

    assert_eq!(widget.chained_type_failure().unwrap(), None);
    assert_eq!(widget.seen().len(), 1);
    assert_eq!(widget.seen()[0].1, "TypeError");

    assert_eq!(widget.chained_reference_failure().unwrap(), None);
    assert_eq!(widget.seen().len(), 2);
    assert_eq!(widget.seen()[1].1, "ReferenceError");
}

#[test]
fn test_catch_all_handles_any_exception() {
    let widget = Widget::default();

    assert_eq!(widget.any_failure().unwrap(), None);
    assert_eq!(widget.seen()[0].1, "ReferenceError");
}

#[test]
fn test_catch_all_runs_when_specific_handler_does_not_match() {
    let widget = Widget::default();

    assert_eq!(widget.unregistered_failure().unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![(
            "fallback ReferenceError: Error here".to_string(),
            "ReferenceError"
        )]
    );
}

#[tokio::test]
async fn test_async_rejection_is_handled() {
    let widget = Widget::default();

    assert_eq!(widget.async_rejection().await.unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![("ReferenceError: Error here".to_string(), "ReferenceError")]
    );
}

#[tokio::test]
async fn test_async_raise_matches_sync_behavior() {
    let widget = Widget::default();

    assert_eq!(widget.async_raise().await.unwrap(), None);
    assert_eq!(widget.reference_failure().unwrap(), None);

    let seen = widget.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}

#[tokio::test]
async fn test_async_unmatched_propagates() {
    let widget = Widget::default();

    let exception = widget.async_unmatched().await.unwrap_err();
    assert!(exception.is(&RANGE_ERROR));
    assert!(widget.seen().is_empty());
}

#[test]
fn test_arguments_are_forwarded() {
    let widget = Widget::default();

    assert_eq!(widget.with_arguments(9, 3).unwrap(), Some(3));
    assert_eq!(widget.with_arguments(9, 0).unwrap(), None);
    assert_eq!(widget.seen()[0].0, "ReferenceError: 9/0");
}

#[test]
fn test_anyhow_wrapped_exception_keeps_its_category() {
    let widget = Widget::default();

    assert_eq!(widget.from_anyhow().unwrap(), None);
    assert_eq!(widget.seen()[0].1, "TypeError");
}

#[test]
fn test_registered_error_type_is_matched_through_anyhow() {
    register_categorized::<PageOutOfRange>();
    let widget = Widget::default();

    assert_eq!(widget.page(3).unwrap(), Some(3));
    assert_eq!(widget.page(12).unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![("page 12 is out of range".to_string(), "RangeError")]
    );
}

#[test]
fn test_parent_category_catches_its_children() {
    let widget = Widget::default();

    assert_eq!(widget.store(512).unwrap(), Some(512));
    assert_eq!(widget.store(4096).unwrap(), None);
    assert_eq!(widget.store(0).unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![
            ("QuotaExceeded: 4096 bytes over quota".to_string(), "QuotaExceeded"),
            ("StorageError: nothing to store".to_string(), "StorageError"),
        ]
    );
}

#[test]
fn test_child_category_does_not_catch_its_parent() {
    let widget = Widget::default();

    let exception = widget.store_unchecked().unwrap_err();
    assert_eq!(exception.category(), &STORAGE_ERROR);
    assert!(widget.seen().is_empty());
}

#[test]
fn test_handler_failure_propagates_as_new_exception() {
    let widget = Widget::default();

    let exception = widget.failing_handler().unwrap_err();
    assert_eq!(exception.to_string(), "RangeError: handler failed");
}

#[test]
fn test_handler_failure_can_be_caught_further_out() {
    let widget = Widget::default();

    assert_eq!(widget.failing_handler_caught_outside().unwrap(), None);
    assert_eq!(
        widget.seen(),
        vec![("RangeError: handler failed".to_string(), "RangeError")]
    );
}

struct Counter {
    value: u32,
}

fn at_limit(_: &Exception, counter: Receiver<'_, Counter>) {
    assert_eq!(counter.instance().map(|c| c.value), Some(u32::MAX));
}

impl Counter {
    #[catch(RANGE_ERROR, at_limit)]
    fn increment(&mut self) -> Result<u32, Exception> {
        self.value = self
            .value
            .checked_add(1)
            .ok_or_else(|| Exception::new(&RANGE_ERROR, "overflow"))?;
        Ok(self.value)
    }
}

#[test]
fn test_mutable_receiver() {
    let mut counter = Counter { value: u32::MAX - 1 };

    assert_eq!(counter.increment().unwrap(), Some(u32::MAX));
    assert_eq!(counter.increment().unwrap(), None);
    assert_eq!(counter.value, u32::MAX);
}
