//! Byte chunks passed between the application and the audio callback.

use std::fmt;
use std::sync::Arc;

/// Storage behind a [`Chunk`].
///
/// Memory is immutable once constructed: its length and contents never
/// change. It either owns its allocation or shares storage owned by the
/// caller, which stays alive for as long as the memory does.
pub enum Memory {
    /// A heap allocation owned by this memory.
    Owned(Box<[u8]>),
    /// Caller-owned storage, kept alive by a shared reference.
    External(Arc<dyn AsRef<[u8]> + Send + Sync>),
}

impl Memory {
    /// Returns the bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(buf) => &buf[..],
            Self::External(buf) => (**buf).as_ref(),
        }
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns `true` if the memory holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this memory owns its allocation.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "External" };
        f.debug_struct("Memory")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

/// A discrete buffer of audio bytes in flight between application and hardware.
///
/// `Chunk` is a cheap, reference-counted handle: cloning shares the
/// underlying [`Memory`]. The memory is released once the queue, the
/// assembler, and every caller-visible clone have dropped it.
///
/// # Example
///
/// ```
/// use stream_audio_io::Chunk;
/// use std::sync::Arc;
///
/// let owned = Chunk::from(vec![1u8, 2, 3, 4]);
/// assert_eq!(owned.len(), 4);
///
/// // Wrap caller storage without copying it
/// let shared: Arc<Vec<u8>> = Arc::new(vec![0u8; 256]);
/// let view = Chunk::external(Arc::clone(&shared));
/// assert_eq!(view.as_bytes().as_ptr(), shared.as_ptr());
/// ```
#[derive(Debug, Clone)]
pub struct Chunk {
    memory: Arc<Memory>,
}

impl Chunk {
    /// Creates a chunk that owns `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            memory: Arc::new(Memory::Owned(bytes.into_boxed_slice())),
        }
    }

    /// Creates a chunk by copying `bytes` into a new allocation.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// Creates a chunk viewing caller-owned storage.
    ///
    /// The storage is pinned until the chunk and all its clones are dropped.
    pub fn external<T>(storage: Arc<T>) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self {
            memory: Arc::new(Memory::External(storage)),
        }
    }

    /// Returns the underlying memory.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Returns the bytes of this chunk.
    pub fn as_bytes(&self) -> &[u8] {
        self.memory.as_slice()
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns `true` if this chunk contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Copies the bytes into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from_slice(bytes)
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Chunk {}
