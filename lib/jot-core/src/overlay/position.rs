use crate::platform::{Bounds, Display, DisplayId, PointerPosition, Size};

/// Where the overlay goes on a given show, in physical desktop pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPosition {
    pub monitor_id: DisplayId,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl OverlayPosition {
    /// Anchors the overlay to the monitor under the pointer, horizontally centred and
    /// `vertical_offset` of the way down the free vertical space. `size` is in logical pixels.
    ///
    /// Falls back to the first monitor when the pointer position is unknown or off every
    /// monitor. Returns `None` when there are no monitors.
    pub fn compute(
        displays: &[Display],
        cursor: Option<&PointerPosition>,
        size: &Size,
        vertical_offset: f32,
    ) -> Option<Self> {
        let display = cursor
            .and_then(|cursor| displays.iter().find(|d| d.contains_pointer(cursor)))
            .or_else(|| displays.first())?;

        let scale = if display.scale_factor > 0.0 {
            display.scale_factor
        } else {
            1.0
        };
        let area = &display.bounds;
        let width = ((size.width as f64 * scale).round() as u32).min(area.size.width);
        let height = ((size.height as f64 * scale).round() as u32).min(area.size.height);

        let free_width = area.size.width - width;
        let free_height = area.size.height - height;
        let offset = vertical_offset.clamp(0.0, 1.0);

        Some(Self {
            monitor_id: display.id,
            x: area.position.x + (free_width / 2) as i32,
            y: area.position.y + (free_height as f32 * offset) as i32,
            width,
            height,
        })
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}
