use enum_primitive_derive::Primitive;

/// We use `u8::MAX` as a reserved separator value. Through the [`DatabaseStorePrefixes`] enum we make sure
/// it is never used as a prefix.
pub const SEPARATOR: u8 = u8::MAX;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Slices ----
    Slices = 1,
    BlockSlices = 2,
    BlockConflictSets = 3,
    SlicesFlags = 4,

    // ---- Segments ----
    Segments = 16,
    BlockSegments = 17,
    SegmentsFlags = 18,
    SegmentCosts = 19,
    FeatureWeights = 20,
    BlockConstraints = 21,

    // ---- Solutions ----
    CoreSolutions = 32,
    SolutionFlags = 33,
    GoldStandards = 34,
    GoldStandardFlags = 35,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl DatabaseStorePrefixes {
    /// The prefix of this store within the given namespace. Namespaces let several label sources (e.g. membrane
    /// predictions and ground truth) share one database.
    pub fn namespaced(self, namespace: u8) -> Vec<u8> {
        vec![self as u8, namespace]
    }
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

impl AsRef<[u8]> for DatabaseStorePrefixes {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}
