//! Parameter buffers handed to the driver

/// Borrowed view of a flat parameter buffer.
///
/// `parameters` holds N logical parameters of a fixed word width back to
/// back (the width is a property of the composition, not of this view).
/// `dirty_flags`, when present, has one flag per logical parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParameterArrayRef<'a> {
    parameters: &'a [u32],
    dirty_flags: Option<&'a [bool]>,
}

impl<'a> ParameterArrayRef<'a> {
    /// View with per-parameter dirty flags.
    pub const fn new(parameters: &'a [u32], dirty_flags: &'a [bool]) -> Self {
        Self {
            parameters,
            dirty_flags: Some(dirty_flags),
        }
    }

    /// View without dirty flags.
    ///
    /// Only operations that always send whole ranges accept it; dirty-aware
    /// operations treat the missing flags as a contract violation.
    pub const fn without_flags(parameters: &'a [u32]) -> Self {
        Self {
            parameters,
            dirty_flags: None,
        }
    }

    /// Parameter words.
    pub const fn parameters(&self) -> &'a [u32] {
        self.parameters
    }

    /// Dirty flags, if any.
    pub const fn dirty_flags(&self) -> Option<&'a [bool]> {
        self.dirty_flags
    }

    /// Number of logical parameters of `parameter_words` words each.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not a whole number of parameters, or if the
    /// dirty flag array does not have one flag per parameter.
    pub fn count(&self, parameter_words: usize) -> usize {
        assert!(
            self.parameters.len() % parameter_words == 0,
            "parameter buffer of {} words is not a multiple of {parameter_words}-word parameters",
            self.parameters.len()
        );
        let count = self.parameters.len() / parameter_words;
        if let Some(flags) = self.dirty_flags {
            assert_eq!(flags.len(), count, "dirty flag array must have one flag per parameter");
        }
        count
    }

    /// Words of logical parameter `index`.
    pub fn parameter(&self, index: usize, parameter_words: usize) -> &'a [u32] {
        &self.parameters[index * parameter_words..(index + 1) * parameter_words]
    }
}
