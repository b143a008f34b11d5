use std::fmt;

/// Opaque backend resource id. Backends never reuse a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(u64);

impl RawHandle {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// The four kinds of bindable resource; one bind slot each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Buffer,
    Texture,
    Program,
    VertexArray,
}

impl HandleKind {
    pub const ALL: [HandleKind; 4] = [
        HandleKind::Buffer,
        HandleKind::Texture,
        HandleKind::Program,
        HandleKind::VertexArray,
    ];

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        match self {
            HandleKind::Buffer => 0,
            HandleKind::Texture => 1,
            HandleKind::Program => 2,
            HandleKind::VertexArray => 3,
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleKind::Buffer => "buffer",
            HandleKind::Texture => "texture",
            HandleKind::Program => "program",
            HandleKind::VertexArray => "vertex array",
        })
    }
}

/// Bind counters since the device was created.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BindStats {
    /// Binds forwarded to the backend.
    pub issued: u64,
    /// Binds dropped because the handle was already bound.
    pub elided: u64,
}

/// Last-bound handle per kind.
///
/// Lives inside one `GraphicsDevice`; two devices never share bind state.
#[derive(Debug, Default)]
pub(crate) struct BindCache {
    bound: [Option<RawHandle>; 4],
    stats: BindStats,
}

impl BindCache {
    /// Records a bind. Returns `true` when the backend must be told.
    pub(crate) fn bind(&mut self, kind: HandleKind, handle: RawHandle) -> bool {
        let slot = &mut self.bound[kind.slot()];
        if *slot == Some(handle) {
            self.stats.elided += 1;
            false
        } else {
            *slot = Some(handle);
            self.stats.issued += 1;
            true
        }
    }

    /// Drops `handle` from its slot if it is the bound one.
    pub(crate) fn forget(&mut self, kind: HandleKind, handle: RawHandle) {
        let slot = &mut self.bound[kind.slot()];
        if *slot == Some(handle) {
            *slot = None;
        }
    }

    pub(crate) fn bound(&self, kind: HandleKind) -> Option<RawHandle> {
        self.bound[kind.slot()]
    }

    pub(crate) fn stats(&self) -> BindStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_bind_is_elided() {
        let mut cache = BindCache::default();
        let h = RawHandle::new(7);
        assert!(cache.bind(HandleKind::Buffer, h));
        assert!(!cache.bind(HandleKind::Buffer, h));
        assert!(!cache.bind(HandleKind::Buffer, h));
        assert_eq!(cache.stats(), BindStats { issued: 1, elided: 2 });
    }

    #[test]
    fn kinds_have_independent_slots() {
        let mut cache = BindCache::default();
        let h = RawHandle::new(1);
        assert!(cache.bind(HandleKind::Buffer, h));
        assert!(cache.bind(HandleKind::Texture, h));
        assert_eq!(cache.bound(HandleKind::Program), None);
    }

    #[test]
    fn forget_only_clears_matching_handle() {
        let mut cache = BindCache::default();
        cache.bind(HandleKind::Program, RawHandle::new(1));
        cache.forget(HandleKind::Program, RawHandle::new(2));
        assert_eq!(cache.bound(HandleKind::Program), Some(RawHandle::new(1)));
        cache.forget(HandleKind::Program, RawHandle::new(1));
        assert_eq!(cache.bound(HandleKind::Program), None);
        // Rebinding after a forget must reach the backend again.
        assert!(cache.bind(HandleKind::Program, RawHandle::new(1)));
    }
}
