/// Typed resource handles.
///
/// A handle is an index plus a generation into the registry arena, tagged at
/// the type level with the kind of resource it names. Handles carry no GPU
/// state and never dangle: once a slot is released its generation moves on and
/// every old handle to it is rejected.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use slotmap::{new_key_type, Key};

new_key_type! {
    /// Arena key shared by every resource kind
    pub struct ResourceKey;
}

/// Runtime tag of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    BufferObject,
    Texture,
    RenderTarget,
    SwapChain,
    Program,
    DescriptorSetLayout,
    DescriptorSet,
    RenderPrimitive,
}

impl HandleKind {
    /// Every kind, in declaration order
    pub const ALL: [HandleKind; 8] = [
        HandleKind::BufferObject,
        HandleKind::Texture,
        HandleKind::RenderTarget,
        HandleKind::SwapChain,
        HandleKind::Program,
        HandleKind::DescriptorSetLayout,
        HandleKind::DescriptorSet,
        HandleKind::RenderPrimitive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HandleKind::BufferObject => "BufferObject",
            HandleKind::Texture => "Texture",
            HandleKind::RenderTarget => "RenderTarget",
            HandleKind::SwapChain => "SwapChain",
            HandleKind::Program => "Program",
            HandleKind::DescriptorSetLayout => "DescriptorSetLayout",
            HandleKind::DescriptorSet => "DescriptorSet",
            HandleKind::RenderPrimitive => "RenderPrimitive",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-level marker for a resource kind
pub trait ResourceKind: 'static {
    const KIND: HandleKind;
}

macro_rules! resource_kinds {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug)]
            pub enum $name {}

            impl ResourceKind for $name {
                const KIND: HandleKind = HandleKind::$name;
            }
        )*
    };
}

resource_kinds! {
    /// Fixed-size byte buffer (vertex, index, uniform or storage)
    BufferObject,
    /// Sampled image or attachment
    Texture,
    /// Set of attachments rendered into by a pass
    RenderTarget,
    /// Presentable image chain
    SwapChain,
    /// Compiled shader program
    Program,
    /// Shape of a descriptor set
    DescriptorSetLayout,
    /// Buffer bindings matching a layout
    DescriptorSet,
    /// Vertex + index buffers drawn together
    RenderPrimitive,
}

// ============================================================================
// Handle<T>
// ============================================================================

/// Opaque handle to a resource of kind `T`
pub struct Handle<T: ResourceKind> {
    key: ResourceKey,
    _kind: PhantomData<fn() -> T>,
}

impl<T: ResourceKind> Handle<T> {
    pub(crate) fn from_key(key: ResourceKey) -> Self {
        Self { key, _kind: PhantomData }
    }

    /// Arena key (stable identity, usable as a map key by devices)
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn kind(&self) -> HandleKind {
        T::KIND
    }

    /// Kind-erased form of this handle
    pub fn erase(self) -> AnyHandle {
        AnyHandle { kind: T::KIND, key: self.key }
    }
}

impl<T: ResourceKind> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ResourceKind> Copy for Handle<T> {}

impl<T: ResourceKind> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: ResourceKind> Eq for Handle<T> {}

impl<T: ResourceKind> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: ResourceKind> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", T::KIND, self.key.data())
    }
}

impl<T: ResourceKind> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// AnyHandle
// ============================================================================

/// Handle with its kind erased to a runtime tag
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnyHandle {
    pub kind: HandleKind,
    pub key: ResourceKey,
}

impl AnyHandle {
    /// Recover the typed handle if the kinds match
    pub fn downcast<T: ResourceKind>(self) -> Option<Handle<T>> {
        (self.kind == T::KIND).then(|| Handle::from_key(self.key))
    }
}

impl<T: ResourceKind> From<Handle<T>> for AnyHandle {
    fn from(handle: Handle<T>) -> Self {
        handle.erase()
    }
}

impl fmt::Debug for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.key.data())
    }
}

impl fmt::Display for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
