use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::{quote, quote_spanned, ToTokens};
use syn::parse::{ParseStream, Parser};
use syn::{
    parse_macro_input, parse_quote, Attribute, Block, Expr, FnArg, GenericArgument, ImplItem,
    Item, ItemImpl, PathArguments, ReturnType, Signature, Token, Type,
};

/// Functions with this name are never guarded by an impl-level registration.
const CONSTRUCTOR: &str = "new";

#[derive(Clone)]
pub enum Registration {
    Typed { category: Expr, handler: Expr },
    All { handler: Expr },
}

impl Registration {
    pub fn parse_typed(input: ParseStream) -> syn::Result<Self> {
        let category: Expr = input.parse()?;
        input.parse::<Token![,]>()?;
        let handler: Expr = input.parse()?;
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }
        Ok(Registration::Typed { category, handler })
    }

    pub fn parse_all(input: ParseStream) -> syn::Result<Self> {
        let handler: Expr = input.parse()?;
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }
        Ok(Registration::All { handler })
    }

    fn from_attribute(attr: &Attribute) -> Option<syn::Result<Self>> {
        let ident = &attr.path().segments.last()?.ident;
        if ident == "catch" {
            Some(attr.parse_args_with(Self::parse_typed))
        } else if ident == "catch_all" {
            Some(attr.parse_args_with(Self::parse_all))
        } else {
            None
        }
    }

    fn layer(&self) -> TokenStream2 {
        match self {
            Registration::Typed { category, handler } => quote! { .catch(&#category, #handler) },
            Registration::All { handler } => quote! { .catch_all(#handler) },
        }
    }
}

pub fn catch_attribute(
    parser: fn(ParseStream) -> syn::Result<Registration>,
    attr: TokenStream,
    item: TokenStream,
) -> TokenStream {
    let outermost = match parser.parse(attr) {
        Ok(registration) => registration,
        Err(e) => return e.to_compile_error().into(),
    };
    let input = parse_macro_input!(item as Item);

    match expand(outermost, input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(outermost: Registration, item: Item) -> syn::Result<TokenStream2> {
    match item {
        Item::Fn(mut function) => {
            // Attributes below this one are closer to the body, so they run first.
            let mut layers = vec![outermost];
            layers.extend(take_registrations(&mut function.attrs)?);
            layers.reverse();

            *function.block = guard(&mut function.sig, &function.block, &layers)?;
            Ok(function.into_token_stream())
        }
        Item::Impl(block) => expand_impl(outermost, block),
        other => Err(syn::Error::new_spanned(
            other,
            "#[catch] can only be used on methods, associated functions and inherent impl blocks",
        )),
    }
}

fn expand_impl(outermost: Registration, mut block: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &block.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[catch] cannot change the signatures of a trait impl; use it on an inherent impl",
        ));
    }

    let mut outer = vec![outermost];
    outer.extend(take_registrations(&mut block.attrs)?);
    outer.reverse();

    for item in &mut block.items {
        let ImplItem::Fn(function) = item else {
            continue;
        };

        let mut layers = take_registrations(&mut function.attrs)?;
        layers.reverse();
        if function.sig.ident != CONSTRUCTOR && guardable(&function.sig) {
            layers.extend(outer.iter().cloned());
        }
        if layers.is_empty() {
            continue;
        }

        function.block = guard(&mut function.sig, &function.block, &layers)?;
    }

    Ok(block.into_token_stream())
}

/// Remove every `#[catch]`/`#[catch_all]` from `attrs`, in source order.
fn take_registrations(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<Registration>> {
    let mut found = Vec::new();
    let mut errors: Option<syn::Error> = None;

    attrs.retain(|attr| match Registration::from_attribute(attr) {
        None => true,
        Some(Ok(registration)) => {
            found.push(registration);
            false
        }
        Some(Err(e)) => {
            match errors.as_mut() {
                Some(errors) => errors.combine(e),
                None => errors = Some(e),
            }
            false
        }
    });

    match errors {
        Some(e) => Err(e),
        None => Ok(found),
    }
}

/// Whether an impl-level registration can wrap this function.
fn guardable(sig: &Signature) -> bool {
    sig.constness.is_none()
        && receiver(sig).is_ok()
        && success_type(&sig.output).is_ok_and(|success| exclusive_borrow(sig, &success).is_ok())
}

/// Rewrite a body so its failures pass through `layers`, innermost first.
fn guard(sig: &mut Signature, block: &Block, layers: &[Registration]) -> syn::Result<Block> {
    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new_spanned(
            constness,
            "#[catch] cannot be used on a const fn",
        ));
    }

    let success = success_type(&sig.output)?;
    exclusive_borrow(sig, &success)?;
    let original = match &sig.output {
        ReturnType::Type(_, ty) => ty.clone(),
        ReturnType::Default => return Err(syn::Error::new_spanned(sig, "#[catch] requires a return type")),
    };
    let receiver = receiver(sig)?;

    let result = if sig.asyncness.is_some() {
        quote! { ::snare::__private::pending::<#original, _>(async #block).await }
    } else {
        quote! { (|| -> #original #block)() }
    };
    let layers = layers.iter().map(Registration::layer);

    sig.output = parse_quote! {
        -> ::core::result::Result<::core::option::Option<#success>, ::snare::Exception>
    };

    syn::parse2(quote! {{
        #[allow(clippy::redundant_closure_call)]
        let __snare_result = #result;
        ::snare::Attempt::new(__snare_result, #receiver)
            #(#layers)*
            .finish()
    }})
}

/// The `T` of a `Result<T, E>` return type.
fn success_type(output: &ReturnType) -> syn::Result<Type> {
    let error = || {
        syn::Error::new_spanned(
            output,
            "#[catch] requires a function returning `Result<T, E>` where `E: Into<snare::Exception>`",
        )
    };

    let ReturnType::Type(_, ty) = output else {
        return Err(error());
    };
    let Type::Path(path) = ty.as_ref() else {
        return Err(error());
    };
    let segment = path.path.segments.last().ok_or_else(error)?;
    if segment.ident != "Result" {
        return Err(error());
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Err(error());
    };

    args.args
        .iter()
        .find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .ok_or_else(error)
}

/// A `&mut self` method cannot hand out a borrow of `self` and also lend
/// `self` to the handlers, so such methods are refused.
fn exclusive_borrow(sig: &Signature, success: &Type) -> syn::Result<()> {
    let Some(FnArg::Receiver(receiver)) = sig.inputs.first() else {
        return Ok(());
    };
    let Type::Reference(reference) = receiver.ty.as_ref() else {
        return Ok(());
    };
    if reference.mutability.is_none() || !borrows(success.to_token_stream()) {
        return Ok(());
    }
    Err(syn::Error::new_spanned(
        success,
        "#[catch] cannot guard a `&mut self` method whose success value borrows from `self`: \
         the handlers need `&self` while that borrow is alive",
    ))
}

/// Whether a type mentions a reference or a non-`'static` lifetime.
fn borrows(tokens: TokenStream2) -> bool {
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            TokenTree::Group(group) if borrows(group.stream()) => return true,
            TokenTree::Punct(punct) if punct.as_char() == '&' => {
                if !matches!(tokens.peek(), Some(TokenTree::Punct(next)) if next.as_char() == '\'') {
                    return true;
                }
            }
            TokenTree::Punct(punct) if punct.as_char() == '\'' => {
                if !matches!(tokens.peek(), Some(TokenTree::Ident(ident)) if ident == "static") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn receiver(sig: &Signature) -> syn::Result<TokenStream2> {
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => {
            if matches!(receiver.ty.as_ref(), Type::Reference(_)) {
                Ok(quote! { ::snare::Receiver::Instance(&*self) })
            } else {
                Err(syn::Error::new_spanned(
                    receiver,
                    "#[catch] needs `&self` or `&mut self`; a consumed receiver cannot be passed to the handler",
                ))
            }
        }
        // Outside an impl there is no `Self`; point the error at the function.
        _ => Ok(quote_spanned! {sig.ident.span()=> ::snare::Receiver::<Self>::of_type() }),
    }
}
