//! Parser for canonical Move type strings such as
//! `0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>`.

use super::types::{StructTag, TypeTag};
use crate::error::{BenchError, Result};
use std::str::FromStr;

struct TagParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TagParser<'a> {
    fn new(src: &'a str) -> Self {
        TagParser { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn error(&self, msg: &str) -> BenchError {
        BenchError::CodecError(format!(
            "Invalid type tag '{}' at offset {}: {}",
            self.src, self.pos, msg
        ))
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn type_tag(&mut self) -> Result<TypeTag> {
        let head = self.ident()?;
        self.skip_ws();
        if self.rest().starts_with("::") {
            return Ok(TypeTag::Struct(Box::new(self.struct_tail(head)?)));
        }
        let tag = match head {
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "u256" => TypeTag::U256,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            "vector" => {
                self.expect("<")?;
                let inner = self.type_tag()?;
                self.expect(">")?;
                TypeTag::Vector(Box::new(inner))
            }
            other => return Err(self.error(&format!("unknown primitive type '{}'", other))),
        };
        Ok(tag)
    }

    fn struct_tail(&mut self, address: &str) -> Result<StructTag> {
        let address = address.parse()?;
        self.expect("::")?;
        let module = self.ident()?.to_string();
        self.expect("::")?;
        let name = self.ident()?.to_string();

        let mut type_args = Vec::new();
        if self.eat("<") {
            loop {
                type_args.push(self.type_tag()?);
                if self.eat(",") {
                    continue;
                }
                self.expect(">")?;
                break;
            }
        }

        Ok(StructTag {
            address,
            module,
            name,
            type_args,
        })
    }

    fn finish(mut self) -> Result<()> {
        self.skip_ws();
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.error("trailing input"))
        }
    }
}

impl FromStr for TypeTag {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = TagParser::new(s);
        let tag = parser.type_tag()?;
        parser.finish()?;
        Ok(tag)
    }
}

impl FromStr for StructTag {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<TypeTag>()? {
            TypeTag::Struct(tag) => Ok(*tag),
            other => Err(BenchError::CodecError(format!(
                "Expected a struct type, got {}",
                other
            ))),
        }
    }
}
