//! Mock construction helpers

use mockall::mock;
use staged_pipeline::Producer;

mock! {
    pub Source {}

    impl Producer for Source {
        type Output = u32;

        fn create(&mut self) -> u32;
        fn terminate(&mut self) -> bool;
    }
}

/// A mock producer expecting exactly `count` values: `terminate` is checked
/// `count + 1` times and `create` called `count` times.
pub fn counted_source(count: usize) -> MockSource {
    let mut source = MockSource::new();
    let mut checks = 0usize;
    source
        .expect_terminate()
        .times(count + 1)
        .returning(move || {
            checks += 1;
            checks > count
        });
    let mut next = 0u32;
    source.expect_create().times(count).returning(move || {
        next += 1;
        next
    });
    source
}
