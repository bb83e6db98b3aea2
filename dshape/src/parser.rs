//! Text front end for datashapes.
//!
//! ```text
//! dshape   := elem ('*' elem)*
//! elem     := '?' atom | atom
//! atom     := INT | 'var' | '...' | NAME '...' | NAME (':' typeset)?
//!           | scalar ('[' scalar ']')?
//!           | '{' field (',' field)* ','? '}'
//!           | '(' dshape (',' dshape)* ')' ('->' dshape)?
//! field    := (ident | quoted) ':' dshape
//! ```
//!
//! `NAME` is an identifier starting with an uppercase letter, `scalar` any
//! name known to the scalar registry. Every datashape produced by [`dshape`]
//! has been validated.
use chumsky::{prelude::*, text::digits};

use crate::{
    error::{DataShapeError, DsResult},
    types::{CType, DataShape, Function, Record, Tuple, Type, TypeSet, TypeVar},
    validation::validate,
};

type Extra<'src> = extra::Err<Rich<'src, char>>;

fn fixed_parser<'src>() -> impl Parser<'src, &'src str, Type, Extra<'src>> + Clone {
    digits(10)
        .to_slice()
        .try_map(|digits: &str, span| {
            digits
                .parse::<u64>()
                .map(Type::Fixed)
                .map_err(|_| Rich::custom(span, format!("invalid dimension size: {}", digits)))
        })
        .labelled("fixed dimension")
}

fn scalar_parser<'src>() -> impl Parser<'src, &'src str, Type, Extra<'src>> + Clone {
    let lower_ident = text::ascii::ident()
        .filter(|name: &&str| name.starts_with(|c: char| c.is_ascii_lowercase()));

    lower_ident
        .then(
            lower_ident
                .padded()
                .delimited_by(just('['), just(']'))
                .or_not(),
        )
        .try_map(|(name, arg): (&str, Option<&str>), span| {
            if name == "var" && arg.is_none() {
                return Ok(Type::Var);
            }
            let full = match arg {
                Some(arg) => format!("{}[{}]", name, arg),
                None => name.to_string(),
            };
            CType::from_name(&full)
                .map(Type::CType)
                .ok_or_else(|| Rich::custom(span, format!("unknown scalar type: {}", full)))
        })
        .labelled("scalar type")
}

#[derive(Clone)]
enum Suffix<'src> {
    Ellipsis,
    Constraint(&'src str),
}

fn typevar_parser<'src>() -> impl Parser<'src, &'src str, Type, Extra<'src>> + Clone {
    let upper_ident = text::ascii::ident()
        .filter(|name: &&str| name.starts_with(|c: char| c.is_ascii_uppercase()));

    let suffix = choice((
        just("...").to(Suffix::Ellipsis),
        just(':')
            .padded()
            .ignore_then(text::ascii::ident())
            .map(Suffix::Constraint),
    ));

    upper_ident
        .then(suffix.or_not())
        .try_map(|(name, suffix): (&str, Option<Suffix>), span| {
            let typevar =
                TypeVar::new(name).map_err(|err| Rich::custom(span, err.to_string()))?;
            match suffix {
                None => Ok(Type::TypeVar(typevar)),
                Some(Suffix::Ellipsis) => Ok(Type::Ellipsis(Some(typevar))),
                Some(Suffix::Constraint(set)) => TypeSet::from_name(set)
                    .map(|typeset| Type::Implements { typevar, typeset })
                    .ok_or_else(|| Rich::custom(span, format!("unknown type set: {}", set))),
            }
        })
        .labelled("type variable")
}

fn field_name_parser<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    let quoted = |quote: char| {
        none_of(quote)
            .repeated()
            .to_slice()
            .delimited_by(just(quote), just(quote))
    };
    choice((text::ascii::ident(), quoted('\''), quoted('"'))).labelled("field name")
}

/// Parser for a single datashape, without validation.
pub fn datashape_parser<'src>() -> impl Parser<'src, &'src str, DataShape, Extra<'src>> + Clone {
    recursive(|dshape| {
        let record = field_name_parser()
            .padded()
            .then_ignore(just(':'))
            .then(dshape.clone().padded())
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just('{'), text::whitespace().then(just('}')))
            .try_map(|fields: Vec<(&str, DataShape)>, span| {
                Record::new(fields.into_iter().map(|(name, ds)| (name, Type::from(ds))))
                    .map(Type::Record)
                    .map_err(|err| Rich::custom(span, err.to_string()))
            })
            .labelled("record");

        let parenthesized = dshape
            .clone()
            .padded()
            .separated_by(just(','))
            .collect::<Vec<DataShape>>()
            .delimited_by(just('('), text::whitespace().then(just(')')))
            .then(just("->").padded().ignore_then(dshape.clone()).or_not())
            .map(|(dshapes, restype)| match restype {
                Some(restype) => Type::Function(Function::new(dshapes, restype)),
                None => Type::Tuple(Tuple::new(dshapes)),
            })
            .labelled("tuple or function");

        let atom = choice((
            just("...").to(Type::Ellipsis(None)),
            fixed_parser(),
            typevar_parser(),
            scalar_parser(),
            record,
            parenthesized,
        ));

        let option = just('?')
            .ignore_then(atom.clone().padded())
            .try_map(|inner, span| {
                Type::option(inner).map_err(|err| Rich::custom(span, err.to_string()))
            })
            .labelled("option");

        choice((option, atom))
            .padded()
            .separated_by(just('*'))
            .at_least(1)
            .collect::<Vec<Type>>()
            .try_map(|parameters, span| {
                DataShape::new(parameters).map_err(|err| Rich::custom(span, err.to_string()))
            })
            .labelled("datashape")
    })
}

fn syntax_error(errors: Vec<Rich<'_, char>>) -> DataShapeError {
    DataShapeError::Syntax(
        errors
            .into_iter()
            .map(|err| format!("{:?}: {}", err.span(), err))
            .collect(),
    )
}

/// Parse and validate a datashape.
///
/// ```rust
/// # use dshape::parser::dshape;
/// let ds = dshape("3 * var * {x: int32, y: ?float64}").unwrap();
/// assert_eq!(ds.ndim(), 2);
/// assert_eq!(ds.to_string(), "3 * var * {x: int32, y: ?float64}");
/// ```
pub fn dshape(src: &str) -> DsResult<DataShape> {
    let ds = datashape_parser()
        .padded()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(syntax_error)?;
    validate(&ds)?;
    Ok(ds)
}

/// Parse several datashapes, stopping at the first failure.
pub fn dshapes<S: AsRef<str>>(srcs: impl IntoIterator<Item = S>) -> DsResult<Vec<DataShape>> {
    srcs.into_iter().map(|src| dshape(src.as_ref())).collect()
}

/// Parse a function signature such as `(A... * T, A... * T) -> A... * T`.
pub fn signature(src: &str) -> DsResult<Function> {
    match Type::from(dshape(src)?) {
        Type::Function(func) => Ok(func),
        other => Err(DataShapeError::InvalidSignature(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dimensions_and_scalars() {
        let ds = dshape("10 * var * int32").unwrap();
        assert_eq!(
            ds.parameters(),
            &[Type::Fixed(10), Type::Var, Type::CType(CType::INT32)]
        );
        assert_eq!(dshape("complex[float32]").unwrap().measure(), &CType::COMPLEX64.into());
        assert_eq!(dshape("real").unwrap().measure(), &CType::FLOAT64.into());
    }

    #[test]
    fn parse_typevars_and_ellipses() {
        let ds = dshape("A... * N * T").unwrap();
        assert_eq!(ds.parameters()[0], Type::ellipsis(Some("A")).unwrap());
        assert_eq!(ds.parameters()[1], Type::typevar("N").unwrap());
        assert_eq!(dshape("... * 3 * int32").unwrap().ellipsis_position(), Some(0));

        let constrained = dshape("3 * T : floating").unwrap();
        assert_eq!(
            constrained.measure(),
            &Type::implements("T", TypeSet::Floating).unwrap()
        );
    }

    #[test]
    fn parse_functions() {
        let func = signature("(A... * int64, 3 * T) -> A... * T").unwrap();
        assert_eq!(func.arity(), 2);
        assert_eq!(func.to_string(), "(A... * int64, 3 * T) -> A... * T");
        assert!(signature("3 * int32").unwrap_err().is_invalid_signature());
        assert_eq!(signature("() -> bool").unwrap().arity(), 0);
    }

    #[test]
    fn parse_records_and_tuples() {
        let ds = dshape("var * {name: string, 'total amount': float64}").unwrap();
        let Type::Record(record) = ds.measure() else {
            panic!("expected a record, got {}", ds.measure());
        };
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["name", "total_amount"]);

        let tuple = dshape("(int32, 2 * float64)").unwrap();
        assert_eq!(tuple.to_string(), "(int32, 2 * float64)");
    }

    #[test]
    fn reject_malformed_input() {
        assert!(dshape("3 * int33").unwrap_err().is_syntax());
        assert!(dshape("int32 * 3").unwrap_err().is_syntax());
        assert!(dshape("... * A... * int32").unwrap_err().is_validation());
        assert!(dshape("3 * ...").unwrap_err().is_validation());
        assert!(dshape("T : floats").is_err());
    }
}
