use cad_authority::AuthorityBundle;
use replay_types::RawOperation;

use crate::context::DesignContext;
use crate::error::OperationError;
use crate::handlers;
use crate::journal::Journal;
use crate::table::HandlerTable;

/// A built-in operation handler.
pub type Handler = fn(&mut Interpreter<'_>, &RawOperation) -> Result<(), OperationError>;

/// Replays operations of one task against the authority.
///
/// Owns the design context for the task. The handler table is fixed for
/// the whole task even if the loader swaps in a new one meanwhile.
pub struct Interpreter<'a> {
    pub(crate) kb: &'a mut dyn AuthorityBundle,
    pub(crate) table: &'a HandlerTable,
    pub(crate) journal: Journal<'a>,
    pub design: DesignContext,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        kb: &'a mut dyn AuthorityBundle,
        table: &'a HandlerTable,
        journal: Journal<'a>,
        design: DesignContext,
    ) -> Self {
        Self {
            kb,
            table,
            journal,
            design,
        }
    }

    pub fn table(&self) -> &HandlerTable {
        self.table
    }

    pub fn journal(&mut self) -> &mut Journal<'a> {
        &mut self.journal
    }

    /// Run every operation in order.
    ///
    /// A failing operation is recorded as `"Operation <type>: <reason>"` and
    /// the next one runs. Only a host-fatal error stops the loop; it is
    /// returned as `Err`.
    pub fn run(&mut self, operations: &[RawOperation]) -> Result<Vec<String>, OperationError> {
        let mut errors = Vec::new();
        for operation in operations {
            match self.execute(operation) {
                Ok(()) => {}
                Err(e) if e.is_host_fatal() => {
                    self.journal.critical(format!("Host failure: {e}"));
                    self.journal.set_operation(None);
                    return Err(e);
                }
                Err(e) => {
                    let message = format!("Operation {}: {}", operation.kind, e);
                    self.journal.error(message.clone());
                    errors.push(message);
                }
            }
        }
        self.journal.set_operation(None);
        Ok(errors)
    }

    /// Look the operation up in the handler table and run it.
    pub fn execute(&mut self, operation: &RawOperation) -> Result<(), OperationError> {
        self.journal.set_operation(Some(&operation.kind));
        self.journal
            .info(format!("Executing operation: {}", operation.kind));

        let kind =
            self.table
                .operation(&operation.kind)
                .ok_or_else(|| OperationError::UnknownOperation {
                    kind: operation.kind.clone(),
                })?;
        let outcome = handlers::handler_for(kind)(self, operation);
        self.design.sync_bodies(self.kb.as_introspect());
        outcome
    }

    /// End the task, handing back the context and the journal.
    pub fn finish(self) -> (DesignContext, Journal<'a>) {
        (self.design, self.journal)
    }
}
