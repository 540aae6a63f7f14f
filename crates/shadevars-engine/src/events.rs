use crate::variable::UniformKey;

/// Notifications for editor/UI clients.
///
/// Delivered over `crossbeam-channel` receivers obtained from `Registry::subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Introspection reported this uniform on the newly installed program.
    Discovered { key: UniformKey, array_size: u32 },

    /// A uniform entered the active set.
    Added { key: UniformKey },

    /// A uniform left the active set (shader swap or explicit delete).
    Deleted { key: UniformKey },

    /// A stored value was overwritten from a vars file or an editor.
    /// `value` is the text form of the new payload.
    ValueChanged { key: UniformKey, value: String },

    /// A program was installed and the active set rebuilt.
    ProgramInstalled { active: usize, overflow: usize },
}
