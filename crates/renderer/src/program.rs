use crate::compile::{assemble_fragment, validate_fragment, ShaderError};

/// One pass's source text and its assembled fragment shader.
#[derive(Debug, Clone)]
pub struct PassProgram {
    id: String,
    source: String,
    assembled: String,
    needs_compile: bool,
}

impl PassProgram {
    /// A fresh program always needs its first compile.
    pub fn new(id: impl Into<String>, source: &str) -> Self {
        Self {
            id: id.into(),
            source: source.to_string(),
            assembled: assemble_fragment(source),
            needs_compile: true,
        }
    }

    /// Stores `source`, flagging a recompile only when the assembled text
    /// changes. Returns whether it changed.
    pub fn set_source(&mut self, source: &str) -> bool {
        if self.source == source {
            return false;
        }
        self.source = source.to_string();
        let assembled = assemble_fragment(source);
        if assembled == self.assembled {
            return false;
        }
        self.assembled = assembled;
        self.needs_compile = true;
        true
    }

    /// Returns and clears the compile flag. Call once per pass per rendered
    /// tick, right where the draw is submitted.
    pub fn consume_compile_flag(&mut self) -> bool {
        std::mem::take(&mut self.needs_compile)
    }

    pub fn needs_compile(&self) -> bool {
        self.needs_compile
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn assembled(&self) -> &str {
        &self.assembled
    }

    pub fn validate(&self) -> Result<(), ShaderError> {
        validate_fragment(&self.assembled)
    }
}
