#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_stream as stream;
pub use vc_wrap as wrap;
