//! Element picking: hover highlighting, click to pick, Escape to cancel.
//!
//! ```text
//!   Idle | Picked --start--> Selecting --click--> Picked (or Idle if nothing hit)
//!                            Selecting --Escape-> Idle
//! ```
//!
//! Only `Selecting` holds a listener [`Subscription`], so leaving it by any
//! path detaches the capturing listeners.

use crate::dom::dom_tree::NodeRef;
use crate::events::{EventKind, EventOutcome, PageEvent, Phase, Subscription, ESCAPE_KEY};
use crate::overlay::Overlay;
use crate::page::{inner_html, style_attribute, Page};
use crate::selector::derive_selector;
use log::{debug, trace};
use std::rc::Rc;

const CAPTURED: [EventKind; 3] = [EventKind::PointerMove, EventKind::Click, EventKind::KeyDown];

/// The picked element with the snapshot taken at pick time.
#[derive(Debug, Clone)]
pub struct PickedElement {
    pub element: NodeRef,
    pub selector: String,
    /// The `style` attribute, `""` when it was absent.
    pub original_style: String,
    pub original_markup: String,
}

impl PickedElement {
    fn capture(element: NodeRef) -> Self {
        PickedElement {
            selector: derive_selector(&element),
            original_style: style_attribute(&element),
            original_markup: inner_html(&element),
            element,
        }
    }
}

#[derive(Debug, Default)]
enum PickerState {
    #[default]
    Idle,
    Selecting {
        hovered: Option<NodeRef>,
        _subscription: Subscription,
    },
    Picked(PickedElement),
}

/// What an event did to the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not selecting, or an event the picker ignores.
    Ignored,
    Hovered,
    HoverCleared,
    Picked,
    /// The click hit nothing; selection ended without a pick.
    PickedNothing,
    Cancelled,
}

impl Transition {
    /// Clicks taken by the picker never reach the page.
    pub fn outcome(self) -> EventOutcome {
        match self {
            Transition::Picked | Transition::PickedNothing => EventOutcome::consumed(),
            _ => EventOutcome::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Picker {
    state: PickerState,
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `Selecting`, abandoning any previous pick or selection.
    pub fn start(&mut self, page: &Page) {
        // Drop the old subscription before registering a new one.
        self.state = PickerState::Idle;
        self.state = PickerState::Selecting {
            hovered: None,
            _subscription: Subscription::subscribe(page.listeners(), &CAPTURED, Phase::Capture),
        };
        debug!("selection started");
    }

    /// Leaves whatever state the picker is in, detaching listeners.
    pub fn stop(&mut self, overlay: &Overlay) {
        if self.is_selecting() {
            overlay.show_highlight(None);
        }
        self.state = PickerState::Idle;
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, PickerState::Selecting { .. })
    }

    pub fn selected(&self) -> Option<&PickedElement> {
        match &self.state {
            PickerState::Picked(picked) => Some(picked),
            _ => None,
        }
    }

    pub fn hovered(&self) -> Option<&NodeRef> {
        match &self.state {
            PickerState::Selecting { hovered, .. } => hovered.as_ref(),
            _ => None,
        }
    }

    pub fn handle_event(&mut self, page: &Page, overlay: &Overlay, event: &PageEvent) -> Transition {
        if !self.is_selecting() {
            return Transition::Ignored;
        }
        match event {
            PageEvent::PointerMove { x, y } => self.on_pointer_move(page, overlay, *x, *y),
            PageEvent::Click { x, y } => self.on_click(page, overlay, *x, *y),
            PageEvent::KeyDown { key } => self.on_key_down(overlay, key),
        }
    }

    fn on_pointer_move(&mut self, page: &Page, overlay: &Overlay, x: f32, y: f32) -> Transition {
        let hit = page.element_from_point(x, y, |node| overlay.is_highlight(node));
        let PickerState::Selecting { hovered, .. } = &mut self.state else {
            return Transition::Ignored;
        };
        match hit {
            Some(element) if overlay.contains(&element) => {
                trace!("pointer over the panel at ({x}, {y})");
                Transition::Ignored
            }
            Some(element) => {
                overlay.show_highlight(page.bounding_box(&element));
                trace!("hovering {}", derive_selector(&element));
                *hovered = Some(element);
                Transition::Hovered
            }
            None => {
                overlay.show_highlight(None);
                *hovered = None;
                Transition::HoverCleared
            }
        }
    }

    fn on_click(&mut self, page: &Page, overlay: &Overlay, x: f32, y: f32) -> Transition {
        let previous = std::mem::take(&mut self.state);
        let hovered = match previous {
            PickerState::Selecting { hovered, .. } => hovered,
            _ => None,
        };
        overlay.show_highlight(None);

        let target = hovered
            .or_else(|| page.element_from_point(x, y, |node| overlay.contains(node)));
        match target {
            Some(element) => {
                let picked = PickedElement::capture(Rc::clone(&element));
                debug!("picked {}", picked.selector);
                self.state = PickerState::Picked(picked);
                Transition::Picked
            }
            None => {
                debug!("click at ({x}, {y}) hit nothing");
                Transition::PickedNothing
            }
        }
    }

    fn on_key_down(&mut self, overlay: &Overlay, key: &str) -> Transition {
        if key != ESCAPE_KEY {
            return Transition::Ignored;
        }
        self.state = PickerState::Idle;
        overlay.show_highlight(None);
        debug!("selection cancelled");
        Transition::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_taffy::Viewport;
    use pretty_assertions::assert_eq;
    use url::Url;

    const MARKUP: &str = r#"<body style="margin: 0;">
        <div id="a" style="height: 100px;">first</div>
        <div id="b" class="x y" style="height: 100px;">second</div>
    </body>"#;

    fn setup() -> (Page, Overlay, Picker) {
        let page = Page::from_html(
            Url::parse("https://example.com/").unwrap(),
            MARKUP,
            Viewport::default(),
        );
        let overlay = Overlay::inject(&page);
        (page, overlay, Picker::new())
    }

    fn listener_count(page: &Page) -> usize {
        page.listeners().borrow().len()
    }

    #[test]
    fn test_start_registers_three_capture_listeners() {
        let (page, _overlay, mut picker) = setup();
        picker.start(&page);
        assert!(picker.is_selecting());
        assert_eq!(listener_count(&page), 3);
        assert!(page.has_capture_listener(EventKind::Click));

        // Restarting replaces rather than stacks.
        picker.start(&page);
        assert_eq!(listener_count(&page), 3);
    }

    #[test]
    fn test_hover_then_click_picks_hovered() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        let hover = picker.handle_event(&page, &overlay, &PageEvent::PointerMove { x: 10.0, y: 150.0 });
        assert_eq!(hover, Transition::Hovered);
        assert!(overlay.is_highlight_visible());

        // The click lands elsewhere but the hovered element wins.
        let click = picker.handle_event(&page, &overlay, &PageEvent::Click { x: 10.0, y: 10.0 });
        assert_eq!(click, Transition::Picked);
        assert_eq!(click.outcome(), EventOutcome::consumed());
        assert!(!overlay.is_highlight_visible());
        assert_eq!(listener_count(&page), 0);

        let picked = picker.selected().unwrap();
        assert_eq!(picked.selector, "#b");
        assert_eq!(picked.original_style, "height: 100px;");
        assert_eq!(picked.original_markup, "second");
    }

    #[test]
    fn test_click_without_hover_uses_point() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        picker.handle_event(&page, &overlay, &PageEvent::Click { x: 10.0, y: 10.0 });
        assert_eq!(picker.selected().unwrap().selector, "#a");
    }

    #[test]
    fn test_click_outside_viewport_ends_without_pick() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        let click = picker.handle_event(&page, &overlay, &PageEvent::Click { x: -5.0, y: 10.0 });
        assert_eq!(click, Transition::PickedNothing);
        assert!(picker.selected().is_none());
        assert!(!picker.is_selecting());
        assert_eq!(listener_count(&page), 0);
    }

    #[test]
    fn test_pointer_over_panel_is_ignored() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        picker.handle_event(&page, &overlay, &PageEvent::PointerMove { x: 10.0, y: 10.0 });
        let panel = page.bounding_box(overlay.panel()).unwrap();
        let over_panel = PageEvent::PointerMove {
            x: panel.left + 1.0,
            y: panel.top + 1.0,
        };
        assert_eq!(picker.handle_event(&page, &overlay, &over_panel), Transition::Ignored);
        assert_eq!(picker.hovered().map(derive_selector).as_deref(), Some("#a"));
    }

    #[test]
    fn test_pointer_outside_viewport_clears_hover() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        picker.handle_event(&page, &overlay, &PageEvent::PointerMove { x: 10.0, y: 10.0 });
        let moved = picker.handle_event(&page, &overlay, &PageEvent::PointerMove { x: 10.0, y: 5000.0 });
        assert_eq!(moved, Transition::HoverCleared);
        assert!(picker.hovered().is_none());
        assert!(!overlay.is_highlight_visible());
    }

    #[test]
    fn test_escape_cancels() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        picker.handle_event(&page, &overlay, &PageEvent::PointerMove { x: 10.0, y: 10.0 });
        assert_eq!(
            picker.handle_event(&page, &overlay, &PageEvent::key("a")),
            Transition::Ignored
        );
        assert!(picker.is_selecting());

        assert_eq!(
            picker.handle_event(&page, &overlay, &PageEvent::key(ESCAPE_KEY)),
            Transition::Cancelled
        );
        assert!(picker.selected().is_none());
        assert!(!overlay.is_highlight_visible());
        assert_eq!(listener_count(&page), 0);

        let late_click = picker.handle_event(&page, &overlay, &PageEvent::Click { x: 10.0, y: 10.0 });
        assert_eq!(late_click.outcome(), EventOutcome::default());
    }

    #[test]
    fn test_restart_abandons_pick() {
        let (page, overlay, mut picker) = setup();
        picker.start(&page);
        picker.handle_event(&page, &overlay, &PageEvent::Click { x: 10.0, y: 10.0 });
        assert!(picker.selected().is_some());
        picker.start(&page);
        assert!(picker.selected().is_none());
        picker.stop(&overlay);
        assert_eq!(listener_count(&page), 0);
    }
}
