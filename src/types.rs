//! Core types for the threadstore comment storage system.

/// CommentId: numeric string, doubles as the comment's Unix creation timestamp
pub type CommentId = String;

/// ThreadId: name of the thread directory beneath the storage root
pub type ThreadId = String;

/// Line that opens and closes a record's header block
pub const HEADER_DELIMITER: &str = "---";

/// Header key holding the comment identifier
pub const ID_KEY: &str = "id";

/// Header key that carries an inline body in legacy records
pub const INLINE_BODY_KEY: &str = "comment";
