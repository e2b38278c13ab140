use std::collections::HashSet;

/// Longest alias handed back before shortening kicks in.
pub const MAX_ALIAS_LENGTH: usize = 128;

const DEFAULT_CANDIDATE: &str = "n";

/// Allocates collision-free, length-bounded node aliases.
///
/// One allocator lives for the duration of one compilation; the alias set
/// never shrinks while the compilation is in progress. Comparison is
/// case-insensitive so `Order` and `order` cannot both be handed out.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    taken: HashSet<String>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        AliasAllocator {
            taken: HashSet::new(),
        }
    }

    /// Allocate using the fixed default candidate.
    pub fn allocate_default(&mut self) -> String {
        self.allocate(DEFAULT_CANDIDATE)
    }

    /// Allocate a unique alias starting from `candidate`.
    ///
    /// An empty candidate passes through unchanged and is not tracked.
    /// Overlong candidates are shortened: dotted path-qualified names lose
    /// their leading segments first, everything else is truncated.
    pub fn allocate(&mut self, candidate: &str) -> String {
        if candidate.is_empty() {
            return String::new();
        }

        let mut base = candidate.to_string();
        while base.chars().count() > MAX_ALIAS_LENGTH {
            if let Some(pos) = base.find('.') {
                base = base[pos + 1..].to_string();
            } else {
                base = base.chars().take(MAX_ALIAS_LENGTH - 3).collect();
            }
        }
        // Dropping segments can consume the whole candidate (a trailing
        // dot); an empty alias cannot name a pattern.
        if base.is_empty() {
            base = DEFAULT_CANDIDATE.to_string();
        }

        let mut alias = base.clone();
        let mut counter = 0u32;
        while self.taken.contains(&alias.to_lowercase()) {
            alias = format!("{}{}", base, counter);
            counter += 1;
        }
        self.taken.insert(alias.to_lowercase());
        alias
    }
}
