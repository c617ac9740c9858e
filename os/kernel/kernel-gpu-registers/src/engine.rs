/// A command-ring engine with its own register block.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Engine {
    /// 3D / render command streamer.
    Render,
    /// Video (BSD) command streamer.
    Video,
    /// Blitter command streamer.
    Blitter,
}

impl Engine {
    /// All engines, in ring-id order.
    pub const ALL: [Self; 3] = [Self::Render, Self::Video, Self::Blitter];

    /// Base offset of the engine's register block.
    #[inline]
    #[must_use]
    pub const fn mmio_base(self) -> u32 {
        match self {
            Self::Render => 0x0_2000,
            Self::Video => 0x1_2000,
            Self::Blitter => 0x2_2000,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Video => "bsd",
            Self::Blitter => "blt",
        }
    }
}

impl core::fmt::Display for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
