//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `log_sink`     | EventSink          | Serial log output        |
//! |                | FeedbackPort       |                          |
//! | `nvs`          | StoragePort        | NVS / in-memory image    |
//! |                | ConfigPort         |                          |
//! | `time`         | ClockPort          | ESP32 system timer       |
//! |                | DelayNs            | FreeRTOS delay           |

pub mod log_sink;
pub mod nvs;
pub mod time;
