//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements   | Connects to                    |
//! |-----------------|--------------|--------------------------------|
//! | `channel_sink`  | EventSink    | `std::sync::mpsc` consumer     |
//! | `log_sink`      | EventSink    | `log` facade                   |
//! | `memory_store`  | ReadingStore | In-process tables              |
//! | `payload`       | -            | Device JSON payloads + topics  |
//! | `time`          | Clock        | Host wall clock / manual clock |

pub mod channel_sink;
pub mod log_sink;
pub mod memory_store;
pub mod payload;
pub mod time;
