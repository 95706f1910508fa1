//! CASL II emitter.
//!
//! Every operand lives on the machine stack: expressions push one word,
//! statements pop what they consume. `gr0` stays zero for the whole run,
//! `gr1` and `gr2` are scratch registers.

use std::*;
use fmt::{Display, Formatter};

use log::debug;

use crate::symbol::{StandardType, Symbol, Type};
use crate::tokenizer::token::BinaryRelation;

mod std_casl2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Label(u32);

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "L{:04}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

impl ArithmeticOp {
    fn mnemonic(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "ADDA",
            ArithmeticOp::Sub => "SUBA",
            ArithmeticOp::Mul => "MULA",
            ArithmeticOp::Div => "DIVA",
            ArithmeticOp::And => "AND",
            ArithmeticOp::Or => "OR",
        }
    }

    /// Run-time routine reached when the operation overflows.
    fn trap(self) -> Option<&'static str> {
        match self {
            ArithmeticOp::Add | ArithmeticOp::Sub | ArithmeticOp::Mul => Some("EOVF"),
            ArithmeticOp::Div => Some("E0DIV"),
            ArithmeticOp::And | ArithmeticOp::Or => None,
        }
    }
}

fn program_label(name: &str) -> String {
    format!("$${}", name)
}

fn procedure_label(name: &str) -> String {
    format!("${}", name)
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[derive(Debug, Default)]
pub(crate) struct MachineCodeGenerator {
    lines: Vec<String>,
    literals: Vec<(Label, String)>,
    label_counter: u32,
}

impl MachineCodeGenerator {
    pub(crate) fn new_label(&mut self) -> Label {
        self.label_counter += 1;
        let label = Label(self.label_counter);
        debug!("allocated label {}", label);
        label
    }

    fn instr(&mut self, mnemonic: &str, operands: &[&str]) {
        if operands.is_empty() {
            self.lines.push(format!("\t{}", mnemonic));
        } else {
            self.lines.push(format!("\t{}\t{}", mnemonic, operands.join(", ")));
        }
    }

    fn push_register(&mut self, register: &str) {
        self.instr("PUSH", &["0", register]);
    }

    fn pop(&mut self, register: &str) {
        self.instr("POP", &[register]);
    }

    fn literal(&mut self, text: String) -> Label {
        let label = self.new_label();
        self.literals.push((label, text));
        label
    }

    /// Program header. Returns the label where the main block must be placed.
    pub(crate) fn start(&mut self, program_name: &str) -> Label {
        let main_label = self.new_label();
        self.lines.push(format!("{}\tSTART", program_label(program_name)));
        self.instr("LAD", &["gr0", "0"]);
        self.instr("CALL", &[&main_label.to_string()]);
        self.instr("CALL", &["FLUSH"]);
        self.instr("SVC", &["0"]);
        main_label
    }

    pub(crate) fn place_label(&mut self, label: Label) {
        self.lines.push(label.to_string());
    }

    pub(crate) fn storage(&mut self, symbol: &Symbol) {
        let line = match &symbol.ty {
            Some(Type::Array { size, .. }) => format!("{}\tDS\t{}", symbol.storage_label(), size),
            _ => format!("{}\tDC\t0", symbol.storage_label()),
        };
        self.lines.push(line);
    }

    /// Pushes the address of a scalar variable. A formal parameter's slot
    /// already holds the caller's address.
    pub(crate) fn push_address(&mut self, symbol: &Symbol) {
        let label = symbol.storage_label();
        if symbol.is_parameter {
            self.instr("LD", &["gr1", &label]);
        } else {
            self.instr("LAD", &["gr1", &label]);
        }
        self.push_register("gr1");
    }

    /// Replaces the index on top of the stack with the element's address.
    /// A single unsigned comparison rejects negative indexes as well.
    pub(crate) fn push_element_address(&mut self, symbol: &Symbol, size: u16) {
        let last_index = (size - 1).to_string();
        self.pop("gr2");
        self.instr("LAD", &["gr1", &last_index]);
        self.instr("CPL", &["gr2", "gr1"]);
        self.instr("JPL", &["EROV"]);
        self.instr("LAD", &["gr1", &symbol.storage_label()]);
        self.instr("ADDA", &["gr1", "gr2"]);
        self.instr("JOV", &["EOVF"]);
        self.push_register("gr1");
    }

    /// Replaces the address on top of the stack with the word it points to.
    pub(crate) fn load_rvalue(&mut self) {
        self.pop("gr1");
        self.instr("LD", &["gr1", "0", "gr1"]);
        self.push_register("gr1");
    }

    pub(crate) fn push_constant(&mut self, value: u16) {
        self.instr("PUSH", &[&value.to_string()]);
    }

    pub(crate) fn arithmetic(&mut self, op: ArithmeticOp) {
        self.pop("gr2");
        self.pop("gr1");
        self.instr(op.mnemonic(), &["gr1", "gr2"]);
        if let Some(trap) = op.trap() {
            self.instr("JOV", &[trap]);
        }
        self.push_register("gr1");
    }

    pub(crate) fn negate(&mut self) {
        self.pop("gr2");
        self.instr("LD", &["gr1", "gr0"]);
        self.instr("SUBA", &["gr1", "gr2"]);
        self.instr("JOV", &["EOVF"]);
        self.push_register("gr1");
    }

    pub(crate) fn not(&mut self) {
        self.pop("gr1");
        self.instr("XOR", &["gr1", "ONE"]);
        self.push_register("gr1");
    }

    /// Compares the two topmost words and pushes 1 when the relation holds.
    pub(crate) fn relation(&mut self, relation: BinaryRelation) {
        use BinaryRelation::*;

        let true_label = self.new_label();
        let end_label = self.new_label();
        let jumps: &[&str] = match relation {
            Eq => &["JZE"],
            Ne => &["JNZ"],
            Lt => &["JMI"],
            Gt => &["JPL"],
            Le => &["JMI", "JZE"],
            Ge => &["JPL", "JZE"],
        };
        self.pop("gr2");
        self.pop("gr1");
        self.instr("CPA", &["gr1", "gr2"]);
        let target = true_label.to_string();
        for jump in jumps {
            self.instr(jump, &[&target]);
        }
        self.instr("LD", &["gr1", "gr0"]);
        self.jump(end_label);
        self.place_label(true_label);
        self.instr("LAD", &["gr1", "1"]);
        self.place_label(end_label);
        self.push_register("gr1");
    }

    /// Stores the value on top of the stack at the address below it.
    pub(crate) fn assign(&mut self) {
        self.pop("gr2");
        self.pop("gr1");
        self.instr("ST", &["gr2", "0", "gr1"]);
    }

    /// Pops a boolean and jumps to `label` when it is false.
    pub(crate) fn jump_if_false(&mut self, label: Label) {
        self.pop("gr1");
        self.instr("CPA", &["gr1", "gr0"]);
        self.instr("JZE", &[&label.to_string()]);
    }

    pub(crate) fn jump(&mut self, label: Label) {
        self.instr("JUMP", &[&label.to_string()]);
    }

    /// Entry of procedure `name`: moves the argument addresses pushed by the
    /// caller into the parameter slots, keeping the return address on top.
    pub(crate) fn procedure_entry(&mut self, name: &str, parameter_slots: &[String]) {
        self.lines.push(procedure_label(name));
        self.pop("gr2");
        for slot in parameter_slots.iter().rev() {
            self.pop("gr1");
            self.instr("ST", &["gr1", slot]);
        }
        self.push_register("gr2");
    }

    pub(crate) fn ret(&mut self) {
        self.instr("RET", &[]);
    }

    /// Stores the value on top of the stack in a fresh anonymous word and
    /// pushes that word's address, so it can be passed by reference.
    pub(crate) fn argument_temporary(&mut self) {
        let label = self.literal("0".to_string()).to_string();
        self.instr("LAD", &["gr2", &label]);
        self.pop("gr1");
        self.instr("ST", &["gr1", "0", "gr2"]);
        self.push_register("gr2");
    }

    pub(crate) fn call(&mut self, procedure: &str) {
        self.instr("CALL", &[&procedure_label(procedure)]);
    }

    /// Reads into the address on top of the stack.
    pub(crate) fn read(&mut self, ty: StandardType) {
        self.pop("gr1");
        match ty {
            StandardType::Char => self.instr("CALL", &["READCHAR"]),
            _ => self.instr("CALL", &["READINT"]),
        }
    }

    pub(crate) fn read_line(&mut self) {
        self.instr("CALL", &["READLINE"]);
    }

    pub(crate) fn write_value(&mut self, ty: StandardType, width: Option<u16>) {
        self.pop("gr1");
        match width {
            Some(width) => self.instr("LAD", &["gr2", &width.to_string()]),
            None => self.instr("LD", &["gr2", "gr0"]),
        }
        let routine = match ty {
            StandardType::Integer => "WRITEINT",
            StandardType::Char => "WRITECHAR",
            StandardType::Boolean => "WRITEBOOL",
        };
        self.instr("CALL", &[routine]);
    }

    pub(crate) fn write_string(&mut self, text: &str) {
        let label = self.literal(quote(text)).to_string();
        self.instr("LAD", &["gr1", &label]);
        self.instr("LD", &["gr2", "gr0"]);
        self.instr("CALL", &["WRITESTR"]);
    }

    pub(crate) fn write_line(&mut self) {
        self.instr("CALL", &["WRITELINE"]);
    }

    pub(crate) fn cast(&mut self, from: StandardType, to: StandardType) {
        use StandardType::*;

        match (from, to) {
            (Integer, Char) => {
                self.pop("gr1");
                self.instr("LAD", &["gr2", "127"]);
                self.instr("AND", &["gr1", "gr2"]);
                self.push_register("gr1");
            }
            (Integer | Char, Boolean) => {
                let label = self.new_label();
                self.pop("gr1");
                self.instr("CPA", &["gr1", "gr0"]);
                self.instr("JZE", &[&label.to_string()]);
                self.instr("LAD", &["gr1", "1"]);
                self.place_label(label);
                self.push_register("gr1");
            }
            _ => (),
        }
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Appends the literal pool, the run-time library and the trailer.
    pub(crate) fn finish(mut self) -> Vec<String> {
        for (label, text) in mem::take(&mut self.literals) {
            self.lines.push(format!("{}\tDC\t{}", label, text));
        }
        self.lines.extend(std_casl2::generate_std_lib());
        self.instr("END", &[]);
        self.lines
    }
}
