pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of an object ID in hexadecimal form
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of an object ID in raw binary form
pub const OBJECT_ID_RAW_LENGTH: usize = 20;
