//! Statistical check that aging keeps old requests ahead of a stream of
//! newer ones: enqueue pages 0..9 in order, with no competing winner, and
//! page 0 should be popped (on average) before page 9.

use bufferpool::buffer::RequestPrioritizer;
use bufferpool::common::PageId;

#[test]
fn aging_favors_older_requests_on_average() {
    let mut page0_positions = Vec::new();
    let mut page9_positions = Vec::new();

    for _ in 0..100 {
        let prp = RequestPrioritizer::new(64);
        for i in 0..10u32 {
            prp.enqueue(PageId::new(i)).unwrap();
        }

        let mut completion_order = Vec::new();
        while let Some(req) = prp.pop_highest() {
            completion_order.push(req.page_id());
            prp.complete(req.page_id());
        }

        let pos0 = completion_order
            .iter()
            .position(|&p| p == PageId::new(0))
            .unwrap();
        let pos9 = completion_order
            .iter()
            .position(|&p| p == PageId::new(9))
            .unwrap();
        page0_positions.push(pos0);
        page9_positions.push(pos9);
    }

    let avg0: f64 = page0_positions.iter().sum::<usize>() as f64 / page0_positions.len() as f64;
    let avg9: f64 = page9_positions.iter().sum::<usize>() as f64 / page9_positions.len() as f64;

    assert!(
        avg0 < avg9,
        "expected page 0's average completion index ({avg0}) below page 9's ({avg9})"
    );
}
