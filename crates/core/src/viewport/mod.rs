use std::ops::Range;

/// Screen position assigned to a visible control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Position of the control within its class.
    pub control: usize,
    /// Row offset from the top of the control area.
    pub row: usize,
}

/// Scrolling window over the controls of one class. Controls have varying
/// heights, so the window is tracked as the index of the first visible control
/// plus a row budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    rows: usize,
    top: usize,
}

impl Viewport {
    pub fn new(rows: usize) -> Self {
        Self { rows, top: 0 }
    }

    /// Index of the first visible control.
    pub fn top(&self) -> usize {
        self.top
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.rows = rows;
    }

    /// Scrolls back to the first control.
    pub fn reset(&mut self) {
        self.top = 0;
    }

    /// Returns true when controls `top..=focus` fit in the row budget.
    pub fn within_bounds(&self, heights: &[usize], focus: usize) -> bool {
        if focus < self.top || focus >= heights.len() {
            return false;
        }
        let mut used = 0;
        for height in &heights[self.top..=focus] {
            used += height;
            if used > self.rows {
                return false;
            }
        }
        true
    }

    /// Moves the window so that `focus` is visible. Scrolling up jumps straight
    /// to `focus`; scrolling down advances one control at a time. Returns true
    /// when the window moved.
    ///
    /// A control taller than the whole budget cannot fit; the window then
    /// settles with that control at the top.
    pub fn scroll_to(&mut self, heights: &[usize], focus: usize) -> bool {
        if focus >= heights.len() {
            return false;
        }
        let before = self.top;
        if focus < self.top {
            self.top = focus;
        } else {
            while self.top < focus && !self.within_bounds(heights, focus) {
                self.top += 1;
            }
        }
        before != self.top
    }

    /// Controls currently on screen: every control from the top that still
    /// fits, stopping at the first that does not. The top control is always
    /// included, even when it is taller than the budget and gets clipped.
    pub fn visible(&self, heights: &[usize]) -> Range<usize> {
        if self.top >= heights.len() {
            return heights.len()..heights.len();
        }
        let end = (self.top + 1..heights.len())
            .find(|&i| !self.within_bounds(heights, i))
            .unwrap_or(heights.len());
        self.top..end
    }

    /// Row offsets of the visible controls.
    pub fn layout(&self, heights: &[usize]) -> Vec<Placement> {
        let mut row = 0;
        self.visible(heights)
            .map(|control| {
                let placement = Placement { control, row };
                row += heights[control];
                placement
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_bounds_sums_heights_from_top() {
        let heights = [3, 6, 3, 3];
        let viewport = Viewport::new(12);

        assert!(viewport.within_bounds(&heights, 0));
        assert!(viewport.within_bounds(&heights, 2));
        assert!(!viewport.within_bounds(&heights, 3));
    }

    #[test]
    fn focus_above_top_is_out_of_bounds() {
        let heights = [3, 3, 3];
        let mut viewport = Viewport::new(9);
        viewport.top = 1;

        assert!(!viewport.within_bounds(&heights, 0));
    }

    #[test]
    fn scrolls_down_one_control_at_a_time() {
        let heights = [6, 3, 3, 3, 3];
        let mut viewport = Viewport::new(9);

        assert!(!viewport.scroll_to(&heights, 1));
        assert_eq!(viewport.top(), 0);

        assert!(viewport.scroll_to(&heights, 2));
        assert_eq!(viewport.top(), 1);
        assert!(viewport.within_bounds(&heights, 2));

        assert!(viewport.scroll_to(&heights, 4));
        assert_eq!(viewport.top(), 2);
    }

    #[test]
    fn scrolling_up_jumps_to_focus() {
        let heights = [3, 3, 3, 3, 3];
        let mut viewport = Viewport::new(6);
        viewport.scroll_to(&heights, 4);
        assert_eq!(viewport.top(), 3);

        assert!(viewport.scroll_to(&heights, 1));
        assert_eq!(viewport.top(), 1);
    }

    #[test]
    fn settles_on_oversized_control() {
        let heights = [3, 24, 3];
        let mut viewport = Viewport::new(9);

        viewport.scroll_to(&heights, 1);
        assert_eq!(viewport.top(), 1);
        assert_eq!(viewport.visible(&heights), 1..2);
        assert_eq!(viewport.layout(&heights), vec![Placement { control: 1, row: 0 }]);
    }

    #[test]
    fn settled_window_always_contains_focus() {
        let heights = [3, 6, 9, 3, 3, 6, 3];
        for rows in 9..20 {
            let mut viewport = Viewport::new(rows);
            for focus in (0..heights.len()).chain((0..heights.len()).rev()) {
                viewport.scroll_to(&heights, focus);
                assert!(viewport.within_bounds(&heights, focus), "rows {rows} focus {focus}");
                let used: usize = heights[viewport.top()..=focus].iter().sum();
                assert!(used <= rows);
            }
        }
    }

    #[test]
    fn layout_stacks_visible_controls() {
        let heights = [3, 6, 3, 3];
        let mut viewport = Viewport::new(12);
        assert_eq!(viewport.visible(&heights), 0..3);

        viewport.scroll_to(&heights, 3);
        assert_eq!(
            viewport.layout(&heights),
            vec![
                Placement { control: 1, row: 0 },
                Placement { control: 2, row: 6 },
                Placement { control: 3, row: 9 },
            ]
        );
    }
}
