/*! Latency and throughput bounds for applications mapped onto
multiprocessor platforms.

The analysis is meant to be called repeatedly by a constraint-based
design-space exploration: each call receives a [Snapshot] of the
current (possibly partial) decisions about execution times, transfer
times, buffer sizes, and execution orders, and returns bounds on the
latency and period of each application that hold for every way of
completing the remaining decisions.

Internally, the snapshot is turned into a mapping- and
scheduling-aware graph ([msag]), a timed marked graph whose
self-timed execution ([sim]) yields the worst-case and best-case
schedules from which the [bounds] are read off.

```
use msag_throughput::time::Duration;
use msag_throughput::{analyze, Actor, Bound, Channel, Interval, Snapshot};

// two actors on one processor, the second feeding back to the first
let order = vec![Interval::decided(1), Interval::decided(2), Interval::decided(0)];
let snapshot = Snapshot::new(
    vec![Actor::new(Duration::from(3)), Actor::new(Duration::from(4))],
    vec![Channel::local(0, 1, 0), Channel::local(1, 0, 1)],
    order.clone(),
    order.clone(),
    order,
    vec![1],
)
.unwrap();
let result = analyze(&snapshot).unwrap();
assert_eq!(
    result.bounds.applications[0].period_bound,
    Bound::Exactly(Duration::from(7))
);
```
*/

pub mod analysis;
pub mod bounds;
pub mod diagnostics;
pub mod domain;
pub mod msag;
pub mod sim;
pub mod snapshot;
pub mod time;

pub use analysis::{analyze, analyze_with, Analysis, AnalysisError, Config, ReversePass, Status};
pub use domain::{Bound, Interval};
pub use snapshot::{Actor, Channel, ConfigError, Snapshot};
