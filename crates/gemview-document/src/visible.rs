//! Which runs are inside the viewport.
//!
//! The sets are rebuilt from scratch on every scroll, resize, relayout or
//! media change, and record the layout generation they were built from so
//! stale keys are never followed into a newer layout.

use std::ops::Range;

use gemview_types::geometry::{Int2, Rangei};

use crate::layout::{DocumentLayout, LinkFlags, LinkId, RunFlags, RunKey};

/// Document-space range shown in a viewport of `height` scrolled to
/// `scroll_y`. `margin` is the page margin used when there is no banner.
pub fn visible_range(scroll_y: i32, height: i32, margin: i32, has_banner: bool) -> Rangei {
    let margin = if has_banner { 0 } else { margin };
    Rangei::new(scroll_y - margin, scroll_y + height - margin)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSets {
    pub generation: u32,
    pub range: Rangei,
    /// First and last content runs (no decorations or images).
    pub first: Option<RunKey>,
    pub last: Option<RunKey>,
    /// Runs of links the viewer can open, decorations included.
    pub links: Vec<RunKey>,
    pub wide: Vec<RunKey>,
    pub players: Vec<RunKey>,
}

impl VisibleSets {
    pub fn collect(doc: &dyn DocumentLayout, range: Rangei) -> Self {
        let mut sets = VisibleSets {
            generation: doc.generation(),
            range,
            ..VisibleSets::default()
        };
        doc.render_range(range, &mut |key, run| {
            if run.is_content() {
                if sets.first.is_none() {
                    sets.first = Some(key);
                }
                sets.last = Some(key);
            }
            if run.pre_id.is_some() && run.flags.contains(RunFlags::WIDE) {
                sets.wide.push(key);
            }
            if run.audio_id.is_some() {
                sets.players.push(key);
            }
            if let Some(id) = run.link_id {
                let supported = doc
                    .link(id)
                    .is_some_and(|l| l.flags.contains(LinkFlags::SUPPORTED_PROTOCOL));
                if supported {
                    sets.links.push(key);
                }
            }
        });
        sets
    }

    /// Whether the keys refer to `doc`'s current layout.
    pub fn is_current(&self, doc: &dyn DocumentLayout) -> bool {
        self.generation == doc.generation()
    }

    /// Visible runs belonging to link `id`.
    pub fn link_runs(&self, doc: &dyn DocumentLayout, id: LinkId) -> Vec<RunKey> {
        self.links
            .iter()
            .copied()
            .filter(|&k| doc.run(k).is_some_and(|r| r.link_id == Some(id)))
            .collect()
    }

    /// First visible link run containing the document-space `pos`.
    pub fn link_at(&self, doc: &dyn DocumentLayout, pos: Int2) -> Option<RunKey> {
        self.links
            .iter()
            .copied()
            .find(|&k| doc.run(k).is_some_and(|r| r.bounds.contains(pos)))
    }

    /// Visible wide run whose vertical span contains `y`.
    pub fn wide_at(&self, doc: &dyn DocumentLayout, y: i32) -> Option<RunKey> {
        self.wide
            .iter()
            .copied()
            .find(|&k| doc.run(k).is_some_and(|r| r.bounds.top() <= y && y <= r.bounds.bottom()))
    }

    /// Links in ordinal order. Links in the top `skip` pixels of the
    /// viewport are not numbered.
    pub fn ordinal_links(&self, doc: &dyn DocumentLayout, skip: i32) -> Vec<LinkId> {
        let top = self.range.start + skip;
        self.links
            .iter()
            .filter_map(|&k| doc.run(k))
            .filter(|r| r.vis_bounds.top() >= top && r.is_decoration())
            .filter_map(|r| r.link_id)
            .collect()
    }

    pub fn link_ordinal(&self, doc: &dyn DocumentLayout, id: LinkId, skip: i32) -> Option<usize> {
        self.ordinal_links(doc, skip).iter().position(|&l| l == id)
    }

    /// Run nearest the middle of the visible range, for keeping the reading
    /// position across a relayout.
    pub fn middle_run(&self, doc: &dyn DocumentLayout) -> Option<RunKey> {
        let mid = (self.range.start + self.range.end) / 2;
        let mut best: Option<(i32, RunKey)> = None;
        doc.render_range(self.range, &mut |key, run| {
            if !run.is_content() {
                return;
            }
            let dist = (run.vis_bounds.mid().y - mid).abs();
            if best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, key));
            }
        });
        best.map(|(_, k)| k)
    }
}

/// Source range of the level-one heading the reader is under: the last one
/// starting at or before the first visible run.
pub fn current_heading(doc: &dyn DocumentLayout, sets: &VisibleSets) -> Option<Range<usize>> {
    let first = doc.run(sets.first?)?;
    let last_start = sets.last.and_then(|k| doc.run(k)).map(|r| r.text.start);
    let mut heading = None;
    for head in doc.headings().iter().filter(|h| h.level == 0) {
        if head.text.start <= first.text.start {
            heading = Some(head.text.clone());
        }
        if last_start.is_some_and(|s| head.text.start > s) {
            break;
        }
    }
    heading
}
