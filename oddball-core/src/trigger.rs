use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerTableError {
    #[error("trigger table holds {0} names, an 8-bit code allows at most 256")]
    TooManyNames(usize),
    #[error("trigger name `{0}` is listed twice")]
    Duplicate(String),
}

/// Ordered event vocabulary; an event's code is its list position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTable {
    names: Vec<String>,
}

impl TriggerTable {
    pub fn new<I, S>(names: I) -> Result<Self, TriggerTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > 256 {
            return Err(TriggerTableError::TooManyNames(names.len()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(TriggerTableError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn code(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| i as u8)
    }

    pub fn name(&self, code: u8) -> Option<&str> {
        self.names.get(code as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Line states for a code, line 0 = least significant bit (pin 2 of a
/// parallel port, marker `S1` in the recorder).
pub fn line_states(code: u8) -> [bool; 8] {
    std::array::from_fn(|bit| code & (1 << bit) != 0)
}
