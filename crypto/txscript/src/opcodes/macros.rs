/// Generates the closed [`OpCode`] enum together with its byte codes, mnemonic table and
/// per-opcode execution handlers.
///
/// Each entry reads `opcode |"ALIAS"| Name<byte, "MNEMONIC">(vm) body`, where the alias is optional
/// and `vm` names the engine binding available to the body.
macro_rules! opcode_list {
    ( $( opcode $(|$alias:literal|)? $name:ident<$num:literal, $mnemonic:literal>($vm:ident) $code:expr )* ) => {
        pub mod codes {
            $(
                #[allow(non_upper_case_globals)]
                #[allow(dead_code)]
                pub const $name: u8 = $num;
            )*
        }

        mod handlers {
            use super::*;

            $(
                #[allow(non_snake_case)]
                #[allow(unused_variables)]
                #[inline]
                pub(super) fn $name($vm: &mut TxScriptEngine<'_>) -> OpCodeResult {
                    $code
                }
            )*
        }

        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum OpCode {
            $( $name, )*
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[ $( OpCode::$name, )* ];

            pub const fn value(self) -> u8 {
                match self {
                    $( OpCode::$name => $num, )*
                }
            }

            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( OpCode::$name => $mnemonic, )*
                }
            }

            pub fn from_value(value: u8) -> Option<Self> {
                match value {
                    $( $num => Some(OpCode::$name), )*
                    _ => None,
                }
            }

            /// Exact (upper case) mnemonic lookup, aliases included
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $( $mnemonic $( | $alias )? => Some(OpCode::$name), )*
                    _ => None,
                }
            }

            pub(crate) fn execute(self, engine: &mut TxScriptEngine<'_>) -> OpCodeResult {
                match self {
                    $( OpCode::$name => handlers::$name(engine), )*
                }
            }
        }
    };
}
