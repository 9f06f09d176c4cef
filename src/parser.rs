use std::rc::Rc;

use crate::{
    ast::{
        BinaryOperator, DictionaryEntry, Expression, FunctionBody, FunctionLiteral, ImportTarget,
        Literal, LogicalOperator, Pattern, Program, Property, Statement, UnaryOperator,
    },
    error::{ErrorKind, LanguageError},
    tokenizer::{Token, TokenKind},
    tree_walk_interpreter::format_number,
};

type ParseResult<'a, T> = Result<(T, &'a [Token]), LanguageError>;

/// Parses a whole token stream into a program.
///
/// Parsing stops at the first error; there is no recovery.
pub fn program(tokens: &[Token]) -> Result<Program, LanguageError> {
    let mut statements = Vec::new();
    let mut tokens = skip_newlines(tokens);

    while !matches!(peek(tokens), None | Some(TokenKind::Eof)) {
        let (stmt, rest) = statement(tokens)?;
        statements.push(stmt);
        tokens = end_of_statement(tokens, rest)?;
    }

    Ok(Program(statements))
}

fn peek(tokens: &[Token]) -> Option<&TokenKind> {
    tokens.first().map(|token| &token.kind)
}

fn skip_newlines(mut tokens: &[Token]) -> &[Token] {
    while let Some(TokenKind::Newline) = peek(tokens) {
        tokens = &tokens[1..];
    }
    tokens
}

fn line(tokens: &[Token]) -> usize {
    tokens.first().map_or(0, |token| token.line)
}

fn error(tokens: &[Token], kind: ErrorKind) -> LanguageError {
    LanguageError::new(kind).with_line(line(tokens))
}

fn found(tokens: &[Token]) -> String {
    tokens
        .first()
        .map_or_else(|| TokenKind::Eof.to_string(), |token| token.text.clone())
}

fn unexpected(tokens: &[Token]) -> LanguageError {
    error(tokens, ErrorKind::Unexpected(found(tokens)))
}

fn consume(tokens: &[Token], token_kind: TokenKind) -> Result<&[Token], LanguageError> {
    match peek(tokens) {
        Some(kind) if kind == &token_kind => Ok(&tokens[1..]),
        _ => Err(error(
            tokens,
            ErrorKind::Expected {
                expected: token_kind.to_string(),
                found: found(tokens),
            },
        )),
    }
}

fn match_identifier(tokens: &[Token]) -> ParseResult<'_, String> {
    match peek(tokens) {
        Some(TokenKind::Identifier(name)) => Ok((name.clone(), &tokens[1..])),
        _ => Err(error(tokens, ErrorKind::ExpectedIdentifier(found(tokens)))),
    }
}

/// Property names after a `.` may also be keywords, such as `list.from`.
fn match_property_name(tokens: &[Token]) -> ParseResult<'_, String> {
    match tokens.first() {
        Some(Token {
            kind: TokenKind::Identifier(name),
            ..
        }) => Ok((name.clone(), &tokens[1..])),
        Some(token) if token.text.starts_with(|c: char| c.is_ascii_alphabetic()) => {
            Ok((token.text.clone(), &tokens[1..]))
        }
        _ => Err(error(tokens, ErrorKind::ExpectedIdentifier(found(tokens)))),
    }
}

/// After a statement there must be a separator, the end of the enclosing
/// block, or the statement must itself have ended with a block.
fn end_of_statement<'a>(before: &'a [Token], rest: &'a [Token]) -> Result<&'a [Token], LanguageError> {
    let consumed = before.len() - rest.len();
    let ended_with_block = consumed > 0 && before[consumed - 1].kind == TokenKind::BlockEnd;

    match peek(rest) {
        Some(TokenKind::Newline) => Ok(skip_newlines(rest)),
        Some(TokenKind::BlockEnd | TokenKind::Eof) | None => Ok(rest),
        _ if ended_with_block => Ok(rest),
        _ => Err(error(
            rest,
            ErrorKind::Expected {
                expected: TokenKind::Newline.to_string(),
                found: found(rest),
            },
        )),
    }
}

fn statement(tokens: &[Token]) -> ParseResult<'_, Statement> {
    match peek(tokens) {
        Some(TokenKind::Let) => declaration(&tokens[1..], false, line(tokens)),
        Some(TokenKind::Const) => declaration(&tokens[1..], true, line(tokens)),
        Some(TokenKind::If) => if_statement(&tokens[1..]),
        Some(TokenKind::While) => while_statement(&tokens[1..], line(tokens)),
        Some(TokenKind::Return) => return_statement(&tokens[1..], line(tokens)),
        Some(TokenKind::Import) => import_statement(&tokens[1..], line(tokens)),
        Some(TokenKind::From) => from_import_statement(&tokens[1..], line(tokens)),
        Some(TokenKind::BlockStart) => {
            let (statements, rest) = block(&tokens[1..])?;
            Ok((Statement::Block(statements), rest))
        }
        _ => {
            let (expr, rest) = expression(tokens)?;
            Ok((Statement::Expression(expr), rest))
        }
    }
}

/// Statements up to and including the closing `BlockEnd`; the opening
/// `BlockStart` has already been consumed.
fn block(tokens: &[Token]) -> ParseResult<'_, Vec<Statement>> {
    let mut statements = Vec::new();
    let mut tokens = skip_newlines(tokens);

    loop {
        match peek(tokens) {
            Some(TokenKind::BlockEnd) => return Ok((statements, &tokens[1..])),
            None | Some(TokenKind::Eof) => {
                return Err(error(
                    tokens,
                    ErrorKind::Expected {
                        expected: TokenKind::BlockEnd.to_string(),
                        found: found(tokens),
                    },
                ))
            }
            _ => {
                let (stmt, rest) = statement(tokens)?;
                statements.push(stmt);
                tokens = end_of_statement(tokens, rest)?;
            }
        }
    }
}

fn declaration(tokens: &[Token], constant: bool, line: usize) -> ParseResult<'_, Statement> {
    let (target, tokens) = pattern(tokens)?;
    let tokens = consume(tokens, TokenKind::Equal)?;
    let (value, tokens) = expression(tokens)?;
    Ok((
        Statement::Declaration {
            target,
            value,
            constant,
            line,
        },
        tokens,
    ))
}

fn if_statement(tokens: &[Token]) -> ParseResult<'_, Statement> {
    let tokens = consume(tokens, TokenKind::LeftParen)?;
    let (condition, tokens) = expression(tokens)?;
    let tokens = consume(tokens, TokenKind::RightParen)?;
    let (then_branch, tokens) = statement(skip_newlines(tokens))?;

    let after = skip_newlines(tokens);
    if let Some(TokenKind::Else) = peek(after) {
        let (else_branch, tokens) = statement(skip_newlines(&after[1..]))?;
        Ok((
            Statement::If(condition, Box::new(then_branch), Some(Box::new(else_branch))),
            tokens,
        ))
    } else {
        Ok((Statement::If(condition, Box::new(then_branch), None), tokens))
    }
}

fn while_statement(tokens: &[Token], line: usize) -> ParseResult<'_, Statement> {
    let tokens = consume(tokens, TokenKind::LeftParen)?;
    let (condition, tokens) = expression(tokens)?;
    let tokens = consume(tokens, TokenKind::RightParen)?;
    let (body, tokens) = statement(skip_newlines(tokens))?;
    Ok((
        Statement::While {
            condition,
            body: Box::new(body),
            line,
        },
        tokens,
    ))
}

fn return_statement(tokens: &[Token], line: usize) -> ParseResult<'_, Statement> {
    match peek(tokens) {
        None | Some(TokenKind::Newline | TokenKind::BlockEnd | TokenKind::Eof) => {
            Ok((Statement::Return { value: None, line }, tokens))
        }
        _ => {
            let (expr, tokens) = expression(tokens)?;
            Ok((
                Statement::Return {
                    value: Some(expr),
                    line,
                },
                tokens,
            ))
        }
    }
}

fn import_statement(tokens: &[Token], line: usize) -> ParseResult<'_, Statement> {
    let (module, tokens) = match_identifier(tokens)?;
    let (alias, tokens) = match peek(tokens) {
        Some(TokenKind::As) => match_identifier(&tokens[1..])?,
        _ => (module.clone(), tokens),
    };
    Ok((
        Statement::Import {
            module,
            target: ImportTarget::Module(alias),
            line,
        },
        tokens,
    ))
}

fn from_import_statement(tokens: &[Token], line: usize) -> ParseResult<'_, Statement> {
    let (module, tokens) = match_identifier(tokens)?;
    let tokens = consume(tokens, TokenKind::Import)?;
    let mut tokens = consume(tokens, TokenKind::LeftBrace)?;

    let mut fields = Vec::new();
    loop {
        if let Some(TokenKind::RightBrace) = peek(tokens) {
            tokens = &tokens[1..];
            break;
        }

        let (field, rest) = match_property_name(tokens)?;
        let (binding, rest) = match peek(rest) {
            Some(TokenKind::As) => match_identifier(&rest[1..])?,
            _ => (field.clone(), rest),
        };
        fields.push((field, binding));
        tokens = rest;

        tokens = match peek(tokens) {
            Some(TokenKind::Comma) => &tokens[1..],
            Some(TokenKind::RightBrace) => tokens,
            _ => return Err(unexpected(tokens)),
        };
    }

    Ok((
        Statement::Import {
            module,
            target: ImportTarget::Fields(fields),
            line,
        },
        tokens,
    ))
}

/// A binding target for declarations and parameters.
fn pattern(tokens: &[Token]) -> ParseResult<'_, Pattern> {
    match peek(tokens) {
        Some(TokenKind::LeftBracket) => list_pattern(&tokens[1..]),
        Some(TokenKind::LeftBrace) => dictionary_pattern(&tokens[1..]),
        _ => {
            let (name, tokens) = match_identifier(tokens)?;
            Ok((Pattern::Identifier(name), tokens))
        }
    }
}

/// `...name`, which must be followed by the closing bracket.
fn rest_element(tokens: &[Token], closing: TokenKind) -> ParseResult<'_, String> {
    let (name, tokens) = match_identifier(tokens)?;
    let after = match peek(tokens) {
        Some(TokenKind::Comma) => &tokens[1..],
        _ => tokens,
    };
    match peek(after) {
        Some(kind) if kind == &closing => Ok((name, &after[1..])),
        _ => Err(error(tokens, ErrorKind::RestNotLast)),
    }
}

fn list_pattern(mut tokens: &[Token]) -> ParseResult<'_, Pattern> {
    let mut elements = Vec::new();

    loop {
        match peek(tokens) {
            Some(TokenKind::RightBracket) => {
                return Ok((Pattern::List { elements, rest: None }, &tokens[1..]))
            }
            Some(TokenKind::Ellipsis) => {
                let (rest, tokens) = rest_element(&tokens[1..], TokenKind::RightBracket)?;
                return Ok((
                    Pattern::List {
                        elements,
                        rest: Some(rest),
                    },
                    tokens,
                ));
            }
            _ => {
                let (element, rest) = pattern(tokens)?;
                elements.push(element);
                tokens = match peek(rest) {
                    Some(TokenKind::Comma) => &rest[1..],
                    Some(TokenKind::RightBracket) => rest,
                    _ => return Err(unexpected(rest)),
                };
            }
        }
    }
}

fn dictionary_pattern(mut tokens: &[Token]) -> ParseResult<'_, Pattern> {
    let mut entries = Vec::new();

    loop {
        match peek(tokens) {
            Some(TokenKind::RightBrace) => {
                return Ok((Pattern::Dictionary { entries, rest: None }, &tokens[1..]))
            }
            Some(TokenKind::Ellipsis) => {
                let (rest, tokens) = rest_element(&tokens[1..], TokenKind::RightBrace)?;
                return Ok((
                    Pattern::Dictionary {
                        entries,
                        rest: Some(rest),
                    },
                    tokens,
                ));
            }
            _ => {
                let (key, rest) = match peek(tokens) {
                    Some(TokenKind::String(key)) => (key.clone(), &tokens[1..]),
                    _ => match_property_name(tokens)?,
                };
                let (target, rest) = match peek(rest) {
                    Some(TokenKind::Colon) => pattern(&rest[1..])?,
                    _ => (Pattern::Identifier(key.clone()), rest),
                };
                entries.push((key, target));
                tokens = match peek(rest) {
                    Some(TokenKind::Comma) => &rest[1..],
                    Some(TokenKind::RightBrace) => rest,
                    _ => return Err(unexpected(rest)),
                };
            }
        }
    }
}

fn expression(tokens: &[Token]) -> ParseResult<'_, Expression> {
    try_expression(tokens)
}

fn try_expression(tokens: &[Token]) -> ParseResult<'_, Expression> {
    match peek(tokens) {
        Some(TokenKind::Try) => {
            let (expr, rest) = try_expression(&tokens[1..])?;
            Ok((Expression::Try(Box::new(expr)), rest))
        }
        _ => assignment(tokens),
    }
}

fn assignment(tokens: &[Token]) -> ParseResult<'_, Expression> {
    let (target, rest) = logical_or(tokens)?;
    let line = line(rest);

    let combine: fn(Expression, Expression, usize) -> Expression = match peek(rest) {
        Some(TokenKind::Equal) => {
            let (value, rest) = expression(&rest[1..])?;
            return Ok((assign_to(target, value, line)?, rest));
        }
        Some(TokenKind::PlusEqual) => |a, b, line| binary_node(a, BinaryOperator::Plus, b, line),
        Some(TokenKind::MinusEqual) => |a, b, line| binary_node(a, BinaryOperator::Minus, b, line),
        Some(TokenKind::StarEqual) => |a, b, line| binary_node(a, BinaryOperator::Multiply, b, line),
        Some(TokenKind::StarStarEqual) => {
            |a, b, line| binary_node(a, BinaryOperator::Power, b, line)
        }
        Some(TokenKind::SlashEqual) => |a, b, line| binary_node(a, BinaryOperator::Divide, b, line),
        Some(TokenKind::PercentEqual) => {
            |a, b, line| binary_node(a, BinaryOperator::Remainder, b, line)
        }
        Some(TokenKind::AndAndEqual) => |a, b, _| logical_node(a, LogicalOperator::And, b),
        Some(TokenKind::OrOrEqual) => |a, b, _| logical_node(a, LogicalOperator::Or, b),
        Some(TokenKind::QuestionQuestionEqual) => {
            |a, b, _| logical_node(a, LogicalOperator::Nullish, b)
        }
        _ => return Ok((target, rest)),
    };

    // `a op= b` is `a = a op b`
    let (operand, rest) = expression(&rest[1..])?;
    let value = combine(target.clone(), operand, line);
    Ok((assign_to(target, value, line)?, rest))
}

/// `operator_line` is the line of the `=` and is used when the target has no
/// line of its own.
fn assign_to(
    target: Expression,
    value: Expression,
    operator_line: usize,
) -> Result<Expression, LanguageError> {
    let target_line = target.line().unwrap_or(operator_line);
    match target {
        Expression::Variable { name, line } => Ok(Expression::Assign {
            name,
            value: Box::new(value),
            line,
        }),
        Expression::Get {
            object,
            property: property @ (Property::Name(_) | Property::Key(_)),
            line,
        } => Ok(Expression::Set {
            object,
            property,
            value: Box::new(value),
            line,
        }),
        _ => Err(LanguageError::new(ErrorKind::InvalidAssignmentTarget).with_line(target_line)),
    }
}

fn binary_node(left: Expression, operator: BinaryOperator, right: Expression, line: usize) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        line,
    }
}

fn logical_node(left: Expression, operator: LogicalOperator, right: Expression) -> Expression {
    Expression::Logical(Box::new(left), operator, Box::new(right))
}

/// Left-associative chain of `precedence` operands joined by the operators
/// `operator` recognises.
fn binary<'a, O>(
    precedence: impl Fn(&'a [Token]) -> ParseResult<'a, Expression>,
    operator: impl Fn(&TokenKind) -> Option<O>,
    combine: impl Fn(Expression, O, Expression, usize) -> Expression,
    tokens: &'a [Token],
) -> ParseResult<'a, Expression> {
    let (mut expr, mut tokens) = precedence(tokens)?;

    while let Some(token) = tokens.first() {
        let op = match operator(&token.kind) {
            Some(op) => op,
            None => break,
        };
        let line = token.line;
        let (right, rest) = precedence(&tokens[1..])?;
        expr = combine(expr, op, right, line);
        tokens = rest;
    }

    Ok((expr, tokens))
}

fn logical_or(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        logical_and,
        |kind| match kind {
            TokenKind::OrOr | TokenKind::Or => Some(LogicalOperator::Or),
            TokenKind::QuestionQuestion => Some(LogicalOperator::Nullish),
            _ => None,
        },
        |left, op, right, _| logical_node(left, op, right),
        tokens,
    )
}

fn logical_and(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        equality,
        |kind| match kind {
            TokenKind::AndAnd | TokenKind::And => Some(LogicalOperator::And),
            _ => None,
        },
        |left, op, right, _| logical_node(left, op, right),
        tokens,
    )
}

fn equality(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        comparison,
        |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOperator::Equal),
            TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        },
        binary_node,
        tokens,
    )
}

fn comparison(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        term,
        |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::LessThan),
            TokenKind::LessEqual => Some(BinaryOperator::LessThanOrEqual),
            TokenKind::Greater => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterThanOrEqual),
            _ => None,
        },
        binary_node,
        tokens,
    )
}

fn term(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        factor,
        |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Plus),
            TokenKind::Minus => Some(BinaryOperator::Minus),
            _ => None,
        },
        binary_node,
        tokens,
    )
}

fn factor(tokens: &[Token]) -> ParseResult<'_, Expression> {
    binary(
        power,
        |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::Percent => Some(BinaryOperator::Remainder),
            _ => None,
        },
        binary_node,
        tokens,
    )
}

/// Right associative: `2 ** 3 ** 2` is `2 ** (3 ** 2)`.
fn power(tokens: &[Token]) -> ParseResult<'_, Expression> {
    let (base, rest) = unary(tokens)?;
    match rest.first() {
        Some(token) if token.kind == TokenKind::StarStar => {
            let (exponent, rest) = power(&rest[1..])?;
            Ok((binary_node(base, BinaryOperator::Power, exponent, token.line), rest))
        }
        _ => Ok((base, rest)),
    }
}

fn unary(tokens: &[Token]) -> ParseResult<'_, Expression> {
    let operator = match peek(tokens) {
        Some(TokenKind::Minus) => UnaryOperator::Negate,
        Some(TokenKind::Bang) => UnaryOperator::Not,
        Some(TokenKind::Ellipsis) => {
            let (operand, rest) = unary(&tokens[1..])?;
            return Ok((Expression::Spread(Box::new(operand), line(tokens)), rest));
        }
        _ => return call(tokens),
    };

    let (operand, rest) = unary(&tokens[1..])?;
    Ok((
        Expression::Unary {
            operator,
            operand: Box::new(operand),
            line: line(tokens),
        },
        rest,
    ))
}

fn call(tokens: &[Token]) -> ParseResult<'_, Expression> {
    let (mut expr, mut tokens) = primary(tokens)?;

    loop {
        let line = line(tokens);
        match peek(tokens) {
            Some(TokenKind::LeftParen) => {
                let (arguments, rest) =
                    comma_separated(&tokens[1..], TokenKind::RightParen, expression)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                    line,
                };
                tokens = rest;
            }
            Some(TokenKind::Dot) => {
                let (name, rest) = match_property_name(&tokens[1..])?;
                expr = Expression::Get {
                    object: Box::new(expr),
                    property: Property::Name(name),
                    line,
                };
                tokens = rest;
            }
            Some(TokenKind::LeftBracket) => {
                let (property, rest) = index(&tokens[1..])?;
                expr = Expression::Get {
                    object: Box::new(expr),
                    property,
                    line,
                };
                tokens = rest;
            }
            _ => break,
        }
    }

    Ok((expr, tokens))
}

/// The inside of `[...]` after a value: a computed key or a `start:end` slice
/// where either bound may be omitted.
fn index(tokens: &[Token]) -> ParseResult<'_, Property> {
    let (start, tokens) = match peek(tokens) {
        Some(TokenKind::Colon) => (None, tokens),
        _ => {
            let (start, rest) = expression(tokens)?;
            (Some(Box::new(start)), rest)
        }
    };

    if let Some(TokenKind::RightBracket) = peek(tokens) {
        return match start {
            Some(key) => Ok((Property::Key(key), &tokens[1..])),
            None => Err(unexpected(tokens)),
        };
    }

    let tokens = consume(tokens, TokenKind::Colon)?;
    let (end, tokens) = match peek(tokens) {
        Some(TokenKind::RightBracket) => (None, tokens),
        _ => {
            let (end, rest) = expression(tokens)?;
            (Some(Box::new(end)), rest)
        }
    };
    let tokens = consume(tokens, TokenKind::RightBracket)?;
    Ok((Property::Slice(start, end), tokens))
}

/// Items separated by commas up to `closing`, allowing a trailing comma. The
/// opening bracket has already been consumed.
fn comma_separated<'a, T>(
    mut tokens: &'a [Token],
    closing: TokenKind,
    item: impl Fn(&'a [Token]) -> ParseResult<'a, T>,
) -> ParseResult<'a, Vec<T>> {
    let mut items = Vec::new();
    loop {
        if let Some(kind) = peek(tokens) {
            if kind == &closing {
                return Ok((items, &tokens[1..]));
            }
        }

        let (value, rest) = item(tokens)?;
        items.push(value);
        tokens = match peek(rest) {
            Some(TokenKind::Comma) => &rest[1..],
            Some(kind) if kind == &closing => rest,
            _ => {
                return Err(error(
                    rest,
                    ErrorKind::Expected {
                        expected: closing.to_string(),
                        found: found(rest),
                    },
                ))
            }
        };
    }
}

fn primary(tokens: &[Token]) -> ParseResult<'_, Expression> {
    let Some(token) = tokens.first() else {
        return Err(unexpected(tokens));
    };

    match &token.kind {
        TokenKind::Number(n) => Ok((Expression::Literal(Literal::Number(*n)), &tokens[1..])),
        TokenKind::String(s) => Ok((
            Expression::Literal(Literal::String(s.clone())),
            &tokens[1..],
        )),
        TokenKind::True => Ok((Expression::Literal(Literal::Boolean(true)), &tokens[1..])),
        TokenKind::False => Ok((Expression::Literal(Literal::Boolean(false)), &tokens[1..])),
        TokenKind::Null => Ok((Expression::Literal(Literal::Null), &tokens[1..])),
        TokenKind::Identifier(name) => {
            if let Some(TokenKind::FatArrow) = peek(&tokens[1..]) {
                let parameters = vec![Pattern::Identifier(name.clone())];
                return function_body(&tokens[2..], parameters, None, token.line);
            }
            Ok((
                Expression::Variable {
                    name: name.clone(),
                    line: token.line,
                },
                &tokens[1..],
            ))
        }
        TokenKind::LeftParen if is_lambda(tokens) => function(&tokens[1..], token.line),
        TokenKind::LeftParen => {
            let (expr, rest) = expression(&tokens[1..])?;
            let tokens = consume(rest, TokenKind::RightParen)?;
            Ok((expr, tokens))
        }
        TokenKind::LeftBracket => {
            let (items, rest) = comma_separated(&tokens[1..], TokenKind::RightBracket, expression)?;
            Ok((Expression::List(items), rest))
        }
        TokenKind::LeftBrace => {
            let (entries, rest) =
                comma_separated(&tokens[1..], TokenKind::RightBrace, dictionary_entry)?;
            Ok((Expression::Dictionary(entries), rest))
        }
        _ => Err(unexpected(tokens)),
    }
}

/// Decides whether the `(` at the front of `tokens` opens a parameter list:
/// its matching `)` must be directly followed by `=>`. The scan gives up at
/// mismatched brackets, statement keywords and line structure.
fn is_lambda(tokens: &[Token]) -> bool {
    let mut open = Vec::new();

    for (i, token) in tokens.iter().enumerate().skip(1) {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                open.push(&token.kind)
            }
            TokenKind::RightParen if open.is_empty() => {
                return matches!(peek(&tokens[i + 1..]), Some(TokenKind::FatArrow));
            }
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                let matched = matches!(
                    (open.pop(), &token.kind),
                    (Some(TokenKind::LeftParen), TokenKind::RightParen)
                        | (Some(TokenKind::LeftBracket), TokenKind::RightBracket)
                        | (Some(TokenKind::LeftBrace), TokenKind::RightBrace)
                );
                if !matched {
                    return false;
                }
            }
            TokenKind::Let
            | TokenKind::Const
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Return
            | TokenKind::Import
            | TokenKind::From
            | TokenKind::FatArrow
            | TokenKind::Newline
            | TokenKind::BlockStart
            | TokenKind::BlockEnd
            | TokenKind::Eof => return false,
            _ => {}
        }
    }

    false
}

/// A parameter list after its `(`, then `=>` and the body.
fn function(mut tokens: &[Token], line: usize) -> ParseResult<'_, Expression> {
    let mut parameters = Vec::new();

    loop {
        match peek(tokens) {
            Some(TokenKind::RightParen) => {
                tokens = &tokens[1..];
                break;
            }
            Some(TokenKind::Ellipsis) => {
                let (rest, after) = rest_element(&tokens[1..], TokenKind::RightParen)?;
                let after = consume(after, TokenKind::FatArrow)?;
                return function_body(after, parameters, Some(rest), line);
            }
            _ => {
                let (parameter, rest) = pattern(tokens)?;
                parameters.push(parameter);
                tokens = match peek(rest) {
                    Some(TokenKind::Comma) => &rest[1..],
                    Some(TokenKind::RightParen) => rest,
                    _ => return Err(unexpected(rest)),
                };
            }
        }
    }

    let tokens = consume(tokens, TokenKind::FatArrow)?;
    function_body(tokens, parameters, None, line)
}

/// The part after `=>`: an indented block or a single expression.
fn function_body(
    tokens: &[Token],
    parameters: Vec<Pattern>,
    rest: Option<String>,
    line: usize,
) -> ParseResult<'_, Expression> {
    let (body, tokens) = match peek(tokens) {
        Some(TokenKind::BlockStart) => {
            let (statements, rest) = block(&tokens[1..])?;
            (FunctionBody::Block(statements), rest)
        }
        _ => {
            let (expr, rest) = expression(tokens)?;
            (FunctionBody::Expression(expr), rest)
        }
    };

    Ok((
        Expression::Function(Rc::new(FunctionLiteral {
            parameters,
            rest,
            body,
            line,
        })),
        tokens,
    ))
}

fn dictionary_entry(tokens: &[Token]) -> ParseResult<'_, DictionaryEntry> {
    match tokens.first().map(|token| (&token.kind, token)) {
        Some((TokenKind::Ellipsis, _)) => {
            let (value, rest) = expression(&tokens[1..])?;
            Ok((DictionaryEntry::Spread(value), rest))
        }
        Some((TokenKind::LeftBracket, _)) => {
            let (key, rest) = expression(&tokens[1..])?;
            let rest = consume(rest, TokenKind::RightBracket)?;
            let rest = consume(rest, TokenKind::Colon)?;
            let (value, rest) = expression(rest)?;
            Ok((DictionaryEntry::Computed(key, value), rest))
        }
        Some((TokenKind::String(key), _)) => {
            let rest = consume(&tokens[1..], TokenKind::Colon)?;
            let (value, rest) = expression(rest)?;
            Ok((DictionaryEntry::Named(key.clone(), value), rest))
        }
        Some((TokenKind::Number(n), _)) => {
            let rest = consume(&tokens[1..], TokenKind::Colon)?;
            let (value, rest) = expression(rest)?;
            Ok((DictionaryEntry::Named(format_number(*n), value), rest))
        }
        Some((kind, token)) => {
            let (key, rest) = match_property_name(tokens)?;
            if let Some(TokenKind::Colon) = peek(rest) {
                let (value, rest) = expression(&rest[1..])?;
                return Ok((DictionaryEntry::Named(key, value), rest));
            }
            // `{ name }` is shorthand for `{ name: name }`
            match kind {
                TokenKind::Identifier(_) => Ok((
                    DictionaryEntry::Named(
                        key.clone(),
                        Expression::Variable {
                            name: key,
                            line: token.line,
                        },
                    ),
                    rest,
                )),
                _ => Err(unexpected(tokens)),
            }
        }
        None => Err(unexpected(tokens)),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tokenizer::tokens;

    fn parse(source: &str) -> Result<Program, LanguageError> {
        program(&tokens(source).expect("Tokenize should work on valid source"))
    }

    fn parsed(source: &str) -> String {
        parse(source)
            .expect("Parse should work on valid source")
            .to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parsed("1 + 2 * 3 - 4"), "((1 + (2 * 3)) - 4)\n");
        assert_eq!(parsed("a || b && c == d"), "(a || (b && (c == d)))\n");
        assert_eq!(parsed("-2 ** 2"), "((-2) ** 2)\n");
        assert_eq!(parsed("2 ** 3 ** 2"), "(2 ** (3 ** 2))\n");
        assert_eq!(parsed("a ?? b < c"), "(a ?? (b < c))\n");
    }

    #[test]
    fn test_calls_and_properties() {
        assert_eq!(parsed("a.b(1, ...c)[0]"), "a.b(1, ...c)[0]\n");
        assert_eq!(parsed("list[1:]"), "list[1:]\n");
        assert_eq!(parsed("list[:-1]"), "list[:(-1)]\n");
        assert_eq!(parsed("list[a:b]"), "list[a:b]\n");
    }

    #[test]
    fn test_keyword_property_names() {
        assert_eq!(parsed("a.from"), "a.from\n");
    }

    #[test]
    fn test_assignment() {
        assert_eq!(parsed("a = b = 1"), "(a = (b = 1))\n");
        assert_eq!(parsed("a.b = 1"), "(a.b = 1)\n");
        assert_eq!(parsed("a[0] = 1"), "(a[0] = 1)\n");
    }

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(parsed("a += 1"), "(a = (a + 1))\n");
        assert_eq!(parsed("a.b **= 2"), "(a.b = (a.b ** 2))\n");
        assert_eq!(parsed("a ??= 2"), "(a = (a ?? 2))\n");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let error = parse("1 = 2").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidAssignmentTarget);

        let error = parse("a[1:2] = 2").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidAssignmentTarget);

        let error = parse("f() = 2").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidAssignmentTarget);
    }

    #[test]
    fn test_invalid_assignment_target_line() {
        let error = parse("let a = 1\nf() = `x\ny`").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidAssignmentTarget);
        assert_eq!(error.line, 2);

        let error = parse("let a = 1\n1 = 2").unwrap_err();
        assert_eq!(error.line, 2);
    }

    fn lambda_ahead(source: &str) -> bool {
        is_lambda(&tokens(source).expect("Tokenize should work on valid source"))
    }

    #[test]
    fn test_lambda_lookahead_boundaries() {
        assert!(lambda_ahead("([a], { b }) => a"));
        assert!(lambda_ahead("(a = f(1)) => a"));

        // mismatched brackets
        assert!(!lambda_ahead("(a, [b) => c"));
        assert!(!lambda_ahead("(a, {b]) => c"));
        assert!(parse("(a, [b) => c").is_err());

        // statement keywords before the closing paren
        assert!(!lambda_ahead("(a if b) => c"));
        assert!(!lambda_ahead("(let a) => a"));
        assert!(!lambda_ahead("(return) => 1"));
        assert!(parse("(a if b) => c").is_err());

        // the first matching paren decides
        assert!(!lambda_ahead("(a)(b) => c"));
        assert_eq!(parsed("(a)(b)"), "a(b)\n");
    }

    #[test]
    fn test_grouping_or_lambda() {
        assert_eq!(parsed("(a + b) * c"), "((a + b) * c)\n");
        assert_eq!(parsed("(a, b) => a + b"), "(a, b) => (a + b)\n");
        assert_eq!(parsed("() => 1"), "() => 1\n");
        assert_eq!(parsed("a => a"), "(a) => a\n");
        assert_eq!(parsed("([a, b], { c }) => a"), "([a, b], { c }) => a\n");
        assert_eq!(parsed("(a, ...rest) => rest"), "(a, ...rest) => rest\n");
        assert_eq!(parsed("(f)(1)"), "f(1)\n");
    }

    #[test]
    fn test_lambda_block_body() {
        let source = "let f = (a) =>\n  let b = a + 1\n  return b\nf(1)";
        assert_eq!(
            parsed(source),
            "let f = (a) => {\nlet b = (a + 1)\nreturn b\n}\nf(1)\n"
        );
    }

    #[test]
    fn test_destructuring_declarations() {
        assert_eq!(parsed("let [a, b, ...c] = d"), "let [a, b, ...c] = d\n");
        assert_eq!(
            parsed("const { a, b: renamed, ...others } = d"),
            "const { a, b: renamed, ...others } = d\n"
        );
    }

    #[test]
    fn test_rest_must_be_last() {
        let error = parse("let [...a, b] = c").unwrap_err();
        assert_eq!(error.kind, ErrorKind::RestNotLast);

        let error = parse("let { ...a, b } = c").unwrap_err();
        assert_eq!(error.kind, ErrorKind::RestNotLast);

        let error = parse("(...a, b) => a").unwrap_err();
        assert_eq!(error.kind, ErrorKind::RestNotLast);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parsed("[1, 'a', true, null,]"), "[1, \"a\", true, null]\n");
        assert_eq!(
            parsed("{ a: 1, 'b c': 2, [k]: 3, d, ...e }"),
            "{ a: 1, b c: 2, [k]: 3, d: d, ...e }\n"
        );
    }

    #[test]
    fn test_number_keys_are_canonical() {
        assert_eq!(
            parsed("{ 1_000: a, .5: b, 1.50: c }"),
            "{ 1000: a, 0.5: b, 1.5: c }\n"
        );
    }

    #[test]
    fn test_if_else() {
        assert_eq!(parsed("if (a) b else c"), "if (a) b else c\n");
        assert_eq!(
            parsed("if (a)\n  b\nelse\n  c\nd"),
            "if (a) {\nb\n} else {\nc\n}\nd\n"
        );
        assert_eq!(parsed("if (a) b\nc"), "if (a) b\nc\n");
    }

    #[test]
    fn test_while_and_return() {
        assert_eq!(parsed("while (a < 3) a += 1"), "while ((a < 3)) (a = (a + 1))\n");
        assert_eq!(
            parsed("() =>\n  return\n"),
            "() => {\nreturn\n}\n"
        );
    }

    #[test]
    fn test_imports() {
        assert_eq!(parsed("import maths"), "import maths\n");
        assert_eq!(parsed("import maths as m"), "import maths as m\n");
        assert_eq!(
            parsed("from maths import { floor, PI as pi }"),
            "from maths import { floor, PI as pi }\n"
        );
    }

    #[test]
    fn test_try() {
        assert_eq!(parsed("try a + b"), "(try (a + b))\n");
        assert_eq!(parsed("let x = try f()"), "let x = (try f())\n");
    }

    #[test]
    fn test_statements_need_separators() {
        let error = parse("a b").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::Expected {
                expected: "newline".to_string(),
                found: "b".to_string()
            }
        );
    }

    #[test]
    fn test_error_lines() {
        let error = parse("let a = 1\nlet b = )").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Unexpected(")".to_string()));
        assert_eq!(error.line, 2);
    }

    #[test]
    fn test_unclosed_bracket() {
        let error = parse("f(1, 2").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::Expected {
                expected: ")".to_string(),
                found: "end of file".to_string()
            }
        );
    }
}
