//! Telemetry extraction driven by an XTCE-style mission database.
//!
//! Packets are described declaratively: parameters carry a type and a
//! physical data encoding, sequence containers list entries and inherit from
//! each other under restriction criteria. The [`TmExtractor`] walks a packet
//! against that description and produces raw and calibrated parameter values
//! plus the list of containers the packet matched.
//!
//! ```no_run
//! use std::sync::Arc;
//! use xtcetm::{MissionDatabase, TmExtractor};
//!
//! # fn mdb() -> MissionDatabase { unimplemented!() }
//! let mdb = Arc::new(mdb());
//! let mut extractor = TmExtractor::new(mdb);
//! extractor.provide_all();
//! let result = extractor.process_packet(&[0u8; 16], 0, 0)?;
//! for pv in result.values.iter() {
//!     println!("{:?} -> {:?}", pv.raw_value, pv.eng_value);
//! }
//! # Ok::<(), xtcetm::ExtractionError>(())
//! ```

pub mod bitbuf;
pub mod calib;
pub mod criteria;
pub mod decode;
pub mod error;
pub mod extractor;
pub mod mdb;
pub mod proc;
pub mod pvlist;
pub mod value;

pub use bitbuf::{BitBuffer, Endianness};
pub use decode::DataDecoder;
pub use error::ExtractionError;
pub use extractor::{
    ContainerExtractionResult, ContainerProcessingResult, ProcessingOptions, TmExtractor,
};
pub use mdb::{MissionDatabase, ParameterIdx};
pub use proc::{ProcessorData, Subscription};
pub use pvlist::{AcquisitionStatus, ParameterValue, ParameterValueList};
pub use value::{AggregateValue, ArrayValue, Value};
