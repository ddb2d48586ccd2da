use skiff_core::QueryWriter;

/// OData v4 query writer.
///
/// The grammar lives in the [`QueryWriter`] defaults; this type exists so a
/// service with dialect quirks can subclass the adapter with an overriding
/// writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ODataWriter;

impl QueryWriter for ODataWriter {
    fn as_dyn(&self) -> &dyn QueryWriter {
        self
    }
}
