use super::OrderKeyError;

/// GPU pipeline configuration a renderable needs while it draws.
///
/// Compared structurally; the [`id`](Self::id) is what goes into the sort key,
/// so items sharing a state end up contiguous after sorting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderState {
    /// Depth-tested, alpha-blended textured sprites.
    Sprite,
    /// Alpha-blended, no depth test (drawn over everything in the pass).
    Overlay,
}

impl RenderState {
    /// Stable non-zero id; zero is reserved for "no state".
    #[inline]
    pub const fn id(self) -> u32 {
        match self {
            RenderState::Sprite => 1,
            RenderState::Overlay => 2,
        }
    }
}

// Field widths, most significant first.
const STATE_BITS: u32 = 24;
const LAYER_BITS: u32 = 8;
const DEPTH_BITS: u32 = 31;
const TRANSPARENT_BITS: u32 = 1;

const _: () = assert!(STATE_BITS + LAYER_BITS + DEPTH_BITS + TRANSPARENT_BITS == u64::BITS);

const TRANSPARENT_SHIFT: u32 = 0;
const DEPTH_SHIFT: u32 = TRANSPARENT_SHIFT + TRANSPARENT_BITS;
const LAYER_SHIFT: u32 = DEPTH_SHIFT + DEPTH_BITS;
const STATE_SHIFT: u32 = LAYER_SHIFT + LAYER_BITS;

pub const MAX_LAYER: u32 = (1 << LAYER_BITS) - 1;
pub const MAX_LAYER_DEPTH: u32 = (1 << DEPTH_BITS) - 1;

/// Packed 64-bit sort key: `state | layer | layer depth | transparent`.
///
/// Sorting ascending groups items by render state first, then draws lower
/// layers and depths first, and opaque before transparent at equal depth.
///
/// The transparency flag is the least significant bit, below the depth, so it
/// only breaks ties between items at the same layer and depth.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DrawOrderKey(u64);

impl DrawOrderKey {
    /// Packs the four inputs, rejecting values that do not fit their field.
    pub fn pack(
        render_state: Option<RenderState>,
        layer: u32,
        layer_depth: u32,
        is_transparent: bool,
    ) -> Result<Self, OrderKeyError> {
        if layer > MAX_LAYER {
            return Err(OrderKeyError::LayerOutOfRange(layer));
        }
        if layer_depth > MAX_LAYER_DEPTH {
            return Err(OrderKeyError::DepthOutOfRange(layer_depth));
        }
        Ok(Self::pack_unchecked(render_state, layer, layer_depth, is_transparent))
    }

    #[inline]
    const fn pack_unchecked(
        render_state: Option<RenderState>,
        layer: u32,
        layer_depth: u32,
        is_transparent: bool,
    ) -> Self {
        let state = match render_state {
            Some(s) => s.id() as u64,
            None => 0,
        };
        Self(
            (state << STATE_SHIFT)
                | ((layer as u64) << LAYER_SHIFT)
                | ((layer_depth as u64) << DEPTH_SHIFT)
                | ((is_transparent as u64) << TRANSPARENT_SHIFT),
        )
    }

    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn render_state_id(self) -> u32 {
        (self.0 >> STATE_SHIFT) as u32
    }

    #[inline]
    pub const fn layer(self) -> u32 {
        ((self.0 >> LAYER_SHIFT) as u32) & MAX_LAYER
    }

    #[inline]
    pub const fn layer_depth(self) -> u32 {
        ((self.0 >> DEPTH_SHIFT) as u32) & MAX_LAYER_DEPTH
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.0 & 1 == 1
    }
}

/// Draw-order inputs of a renderable plus their cached [`DrawOrderKey`].
///
/// The key is recomputed by every setter; range errors leave the previous
/// inputs (and key) untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrawOrder {
    render_state: Option<RenderState>,
    layer: u32,
    layer_depth: u32,
    is_transparent: bool,
    key: DrawOrderKey,
}

impl DrawOrder {
    pub const fn new(render_state: Option<RenderState>) -> Self {
        Self {
            render_state,
            layer: 0,
            layer_depth: 0,
            is_transparent: false,
            key: DrawOrderKey::pack_unchecked(render_state, 0, 0, false),
        }
    }

    #[inline]
    pub fn key(&self) -> DrawOrderKey {
        self.key
    }

    #[inline]
    pub fn render_state(&self) -> Option<RenderState> {
        self.render_state
    }

    #[inline]
    pub fn layer(&self) -> u32 {
        self.layer
    }

    #[inline]
    pub fn layer_depth(&self) -> u32 {
        self.layer_depth
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.is_transparent
    }

    pub fn set_render_state(&mut self, render_state: Option<RenderState>) {
        self.render_state = render_state;
        self.repack();
    }

    pub fn set_layer(&mut self, layer: u32) -> Result<(), OrderKeyError> {
        if layer > MAX_LAYER {
            return Err(OrderKeyError::LayerOutOfRange(layer));
        }
        self.layer = layer;
        self.repack();
        Ok(())
    }

    pub fn set_layer_depth(&mut self, layer_depth: u32) -> Result<(), OrderKeyError> {
        if layer_depth > MAX_LAYER_DEPTH {
            return Err(OrderKeyError::DepthOutOfRange(layer_depth));
        }
        self.layer_depth = layer_depth;
        self.repack();
        Ok(())
    }

    pub fn set_transparent(&mut self, is_transparent: bool) {
        self.is_transparent = is_transparent;
        self.repack();
    }

    fn repack(&mut self) {
        self.key = DrawOrderKey::pack_unchecked(
            self.render_state,
            self.layer,
            self.layer_depth,
            self.is_transparent,
        );
    }
}
