//! The IPLD face of a UCAN: link types, codec constants and the DAG-CBOR
//! model.

mod ucan;
pub use ucan::*;

use cid::CidGeneric;
use multihash::MultihashGeneric;

/// Multicodec code of DAG-CBOR, the block codec of canonical UCANs
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// Multicodec code of RAW, the block codec of tokens retained in their
/// original JWT form
pub const RAW_CODEC: u64 = 0x55;

/// Multihash code of the identity "hash"
pub const IDENTITY_CODE: u64 = 0x00;

/// Digest allocation for [`Link`]. Proofs may be inlined as identity
/// multihashes whose digest is an entire embedded token, so links reserve
/// far more room than a conventional digest needs.
pub const LINK_ALLOC_SIZE: usize = 2048;

/// A multihash wide enough to carry an inlined token
pub type Multihash = MultihashGeneric<LINK_ALLOC_SIZE>;

/// A content address referring to another UCAN, as found in the `prf` field
pub type Link = CidGeneric<LINK_ALLOC_SIZE>;
