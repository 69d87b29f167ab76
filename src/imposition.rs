//! Output-page planning: which input page lands in which cell of which
//! output page, in booklet or straight N-up mode, and the resulting
//! iteration/reversal/copies rules.

use crate::nup;
use crate::options::{FilterOptions, MultipleDocumentHandling, PageDelivery};

/// One input page assigned to one cell of one output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub output_page: u32,
    pub cell: u32,
    pub document_index: u32,
    pub input_page: u32,
}

/// One input document's page range, as handed to the planner in document
/// order.
#[derive(Debug, Clone, Copy)]
pub struct DocumentPages {
    pub first_page: u32,
    pub last_page: u32,
}

/// Plans the full set of [`Placement`]s for a job, given each document's
/// page range and the options controlling imposition. Only pages for which
/// `options.is_page_in_range` (relative to the document, when
/// `multiple_document_handling` resets per document) is true are placed.
pub fn plan(documents: &[DocumentPages], options: &FilterOptions) -> Vec<Placement> {
    if options.imposition_template == "booklet" {
        plan_booklet(documents, options)
    } else {
        plan_nup(documents, options)
    }
}

fn resets_per_document(options: &FilterOptions) -> bool {
    !matches!(
        options.multiple_document_handling,
        MultipleDocumentHandling::SingleDoc | MultipleDocumentHandling::SingleDocNewSheet
    )
}

fn plan_booklet(documents: &[DocumentPages], options: &FilterOptions) -> Vec<Placement> {
    let mut selected = Vec::new();
    for (doc_idx, doc) in documents.iter().enumerate() {
        let mut page = doc.first_page;
        while page <= doc.last_page {
            let relative = page - doc.first_page + 1;
            let test_page = if resets_per_document(options) { relative } else { page };
            if options.is_page_in_range(test_page) {
                selected.push((doc_idx as u32, page));
            }
            page += 1;
        }
    }

    let num_outpages = nup::booklet_num_outpages(selected.len() as u32);
    selected
        .into_iter()
        .enumerate()
        .map(|(current, (document_index, input_page))| Placement {
            output_page: nup::booklet_output_page(current as u32, num_outpages),
            cell: nup::booklet_cell(current as u32),
            document_index,
            input_page,
        })
        .collect()
}

fn plan_nup(documents: &[DocumentPages], options: &FilterOptions) -> Vec<Placement> {
    let num_layout = options.number_up.max(1);
    let mut placements = Vec::new();
    let mut current = 0u32;
    let mut layout = 0u32;

    for (doc_idx, doc) in documents.iter().enumerate() {
        let mut page = doc.first_page;
        while page <= doc.last_page {
            let relative = page - doc.first_page + 1;
            let test_page = if resets_per_document(options) { relative } else { page };
            if options.is_page_in_range(test_page) {
                placements.push(Placement {
                    output_page: current,
                    cell: layout,
                    document_index: doc_idx as u32,
                    input_page: page,
                });
                layout += 1;
                if layout == num_layout {
                    current += 1;
                    layout = 0;
                }
            }
            page += 1;
        }

        if resets_per_document(options) && layout != 0 {
            current += 1;
            layout = 0;
        } else if options.multiple_document_handling == MultipleDocumentHandling::SingleDocNewSheet
            && current % 2 == 1
        {
            current += 1;
            layout = 0;
        }
    }

    placements
}

/// `reverse_order` per the output-ordering rule: true if `output_bin ==
/// "face-up"` XOR `page_delivery` names a reverse-order variant XOR
/// `options.reverse_order`.
pub fn should_reverse_order(options: &FilterOptions) -> bool {
    let face_up = options.output_bin == "face-up";
    let delivery_reverse = matches!(
        options.page_delivery,
        PageDelivery::ReverseOrderFaceDown | PageDelivery::ReverseOrderFaceUp
    );
    face_up ^ delivery_reverse ^ options.reverse_order
}

/// Iterates output page indices `0..num_outpages` in the order they should
/// be emitted, honoring [`should_reverse_order`].
pub fn output_order(num_outpages: u32, options: &FilterOptions) -> Box<dyn Iterator<Item = u32>> {
    if should_reverse_order(options) {
        Box::new((0..num_outpages).rev())
    } else {
        Box::new(0..num_outpages)
    }
}

/// Whether copies should be produced by the PDF writer's `/Count` hardware
/// mechanism (true) or by software duplication of the page sequence
/// (false). `is_pdf_family_mime` is the negotiated final content type.
pub fn use_hardware_copies(is_pdf_family_mime: bool, hardware_copies_requested: bool) -> bool {
    is_pdf_family_mime || hardware_copies_requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;

    fn opts() -> FilterOptions {
        FilterOptions::default()
    }

    #[test]
    fn nup_wraps_to_new_output_page_at_layout_boundary() {
        let mut o = opts();
        o.number_up = 2;
        let docs = [DocumentPages { first_page: 1, last_page: 4 }];
        let placements = plan_nup(&docs, &o);
        assert_eq!(placements.len(), 4);
        assert_eq!(placements[0].output_page, 0);
        assert_eq!(placements[1].output_page, 0);
        assert_eq!(placements[2].output_page, 1);
        assert_eq!(placements[3].output_page, 1);
    }

    #[test]
    fn booklet_forces_2up_pairing_and_reverses_second_half() {
        let o = opts();
        let docs = [DocumentPages { first_page: 1, last_page: 8 }];
        let placements = plan_booklet(&docs, &o);
        let out_pages: Vec<u32> = placements.iter().map(|p| p.output_page).collect();
        assert_eq!(out_pages, vec![0, 1, 2, 3, 3, 2, 1, 0]);
        let cells: Vec<u32> = placements.iter().map(|p| p.cell).collect();
        assert_eq!(cells, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn reverse_order_xors_three_signals() {
        let mut o = opts();
        o.reverse_order = true;
        assert!(should_reverse_order(&o));
        o.output_bin = "face-up".to_string();
        assert!(!should_reverse_order(&o));
    }
}
