use std::cell::RefCell;
use std::rc::Rc;

use crate::common::data::Data;

/// One slot of the value stack.
/// Almost everything is plain `Data`; a `for` loop in flight parks its
/// iteration state in an `Iter` slot, tagged with the address of the
/// `ListNext` instruction that owns it so no other loop can pick it up.
#[derive(Debug)]
pub enum Slot {
    Data(Data),
    Iter {
        owner: usize,
        items: Rc<RefCell<Vec<Data>>>,
        index: usize,
    },
}
