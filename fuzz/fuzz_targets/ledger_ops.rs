#![no_main]

use libfuzzer_sys::fuzz_target;
use command_ledger::testing::{Register, SetValue};
use command_ledger::HistoryLedger;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, arbitrary::Arbitrary)]
enum Op {
    Execute(i64),
    Undo,
    Redo,
    Clear,
}

#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzInput {
    depth: u8,
    ops: Vec<Op>,
}

fuzz_target!(|data: FuzzInput| {
    let depth = NonZeroUsize::new(data.depth as usize).unwrap_or(NonZeroUsize::MIN);
    let mut ledger = HistoryLedger::new(depth);
    let mut reg = Register::new(0);

    for op in data.ops {
        match op {
            Op::Execute(v) => {
                ledger.execute(SetValue::new(v), &mut reg).expect("SetValue never fails");
            }
            Op::Undo => {
                ledger.undo(&mut reg).expect("undo of SetValue never fails");
            }
            Op::Redo => {
                ledger.redo(&mut reg).expect("redo of SetValue never fails");
            }
            Op::Clear => {
                ledger.clear().expect("ledger is never corrupted here");
            }
        }
        assert!(ledger.cursor() <= ledger.len());
        assert!(ledger.cursor() <= depth.get());
        // every undoable write is still on the register's write log
        assert!(reg.writes.len() >= ledger.cursor());
    }
});
