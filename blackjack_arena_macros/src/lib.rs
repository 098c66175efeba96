use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Ident, ImplItemFn};

/// This macro is added before a method of the `Table` struct in the impl block.
/// Use this macro to first check if current game phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(PlayerTurn)]` will make a method first check
/// if current game phase is `PlayerTurn`. If not, the method returns
/// `ArenaError::WrongPhase` naming the method, the expected phase and the
/// actual one. `GamePhase` and `ArenaError` must be in scope where the
/// attribute is used, and the method must return `Result<_, ArenaError>`.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let phase = parse_macro_input!(attr as Ident);
    let mut ast = parse_macro_input!(item as ImplItemFn);
    let operation = ast.sig.ident.to_string();

    let guard: syn::Stmt = match syn::parse2(phase_guard(&phase, &operation)) {
        Ok(stmt) => stmt,
        Err(err) => return err.to_compile_error().into(),
    };
    ast.block.stmts.insert(0, guard);
    ast.into_token_stream().into()
}

fn phase_guard(phase: &Ident, operation: &str) -> TokenStream2 {
    quote! {
        if self.current_game_phase != GamePhase::#phase {
            return Err(ArenaError::WrongPhase {
                operation: #operation,
                expected: GamePhase::#phase,
                actual: self.current_game_phase,
            });
        }
    }
}
