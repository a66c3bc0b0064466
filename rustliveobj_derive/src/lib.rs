use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    parse_macro_input,
};

/// Derives the `Entity` trait plus a typed accessor trait for
/// `LiveObject<Self>`.
///
/// Struct attributes:
/// - `#[entity(name = "...")]`: entity type name (defaults to the struct name)
/// - `#[entity(transformation = "implementation_based")]`: collection mode
/// - `#[entity(field_accessor)]`: enable the generic named accessor
///
/// Field attributes:
/// - `#[entity(id)]`: the identifying field, optionally with
///   `generator = "sequence" | "random" | "explicit"`
/// - `#[entity(reference)]`: the field references another entity
///   (`Option<EntityType>`)
/// - `#[entity(collection = "...")]`: override the inferred collection kind
/// - `#[entity(skip)]`: the field is invisible to the engine
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Transformation {
    Auto,
    ImplementationBased,
}

struct StructOpts {
    name: Option<String>,
    transformation: Transformation,
    field_accessor: bool,
}

#[derive(Default)]
struct FieldOpts {
    id: bool,
    reference: bool,
    skip: bool,
    generator: Option<String>,
    collection: Option<String>,
}

enum FieldCategory {
    Scalar { data_type: TokenStream2 },
    Collection { kind: TokenStream2, proxy: TokenStream2, accessor: Ident },
    Reference { target: Type },
}

struct FieldModel {
    ident: Ident,
    name: String,
    ty: Type,
    category: FieldCategory,
    id: bool,
    generator: Option<TokenStream2>,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_ident = input.ident.clone();
    let vis = input.vis.clone();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Entity)] does not support generic types",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Entity)] can only be applied to structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Entity)] requires named fields",
        ));
    };

    let opts = parse_struct_opts(&input.attrs)?;
    let entity_name = opts
        .name
        .clone()
        .unwrap_or_else(|| struct_ident.to_string());

    let mut models = Vec::new();
    for field in &named.named {
        let field_opts = parse_field_opts(&field.attrs)?;
        if field_opts.skip {
            continue;
        }
        models.push(build_field_model(field, field_opts)?);
    }

    let descriptor_calls = models
        .iter()
        .map(|model| descriptor_call(model))
        .collect::<syn::Result<Vec<_>>>()?;
    let transformation_tokens = match opts.transformation {
        Transformation::Auto => quote!(::rustliveobj::TransformationMode::Auto),
        Transformation::ImplementationBased => {
            quote!(::rustliveobj::TransformationMode::ImplementationBased)
        }
    };
    let field_accessor = opts.field_accessor;

    let get_arms = models.iter().map(get_arm);
    let set_arms = models.iter().map(set_arm);

    let accessor_ident = format_ident!("{}Accessors", struct_ident);
    let accessor_doc = format!(
        "Typed live accessors for [`{}`], implemented on `LiveObject<{}>`.",
        struct_ident, struct_ident
    );
    let mut trait_sigs = Vec::new();
    let mut trait_impls = Vec::new();
    for model in &models {
        accessor_methods(
            model,
            opts.transformation,
            &mut trait_sigs,
            &mut trait_impls,
        );
    }

    Ok(quote! {
        impl ::rustliveobj::entity::Entity for #struct_ident {
            fn descriptor() -> ::rustliveobj::registry::EntityDescriptor {
                ::rustliveobj::registry::EntityDescriptor::builder(#entity_name)
                    #(#descriptor_calls)*
                    .transformation(#transformation_tokens)
                    .field_accessor(#field_accessor)
                    .build()
            }

            fn get_field(&self, field: &str) -> ::rustliveobj::Result<::rustliveobj::Value> {
                match field {
                    #(#get_arms)*
                    other => ::std::result::Result::Err(::rustliveobj::LiveError::FieldNotFound(
                        other.to_string(),
                        #entity_name.to_string(),
                    )),
                }
            }

            fn set_field(
                &mut self,
                field: &str,
                value: ::rustliveobj::Value,
            ) -> ::rustliveobj::Result<()> {
                match field {
                    #(#set_arms)*
                    other => ::std::result::Result::Err(::rustliveobj::LiveError::FieldNotFound(
                        other.to_string(),
                        #entity_name.to_string(),
                    )),
                }
            }
        }

        #[doc = #accessor_doc]
        #[allow(dead_code)]
        #vis trait #accessor_ident {
            #(#trait_sigs)*
        }

        impl #accessor_ident for ::rustliveobj::LiveObject<#struct_ident> {
            #(#trait_impls)*
        }
    })
}

fn parse_struct_opts(attrs: &[syn::Attribute]) -> syn::Result<StructOpts> {
    let mut opts = StructOpts {
        name: None,
        transformation: Transformation::Auto,
        field_accessor: false,
    };
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                opts.name = Some(lit.value());
            } else if meta.path.is_ident("transformation") {
                let lit: LitStr = meta.value()?.parse()?;
                opts.transformation = match lit.value().as_str() {
                    "auto" => Transformation::Auto,
                    "implementation_based" => Transformation::ImplementationBased,
                    other => {
                        return Err(meta.error(format!("unknown transformation mode '{}'", other)));
                    }
                };
            } else if meta.path.is_ident("field_accessor") {
                opts.field_accessor = true;
            } else {
                return Err(meta.error("unknown entity attribute"));
            }
            Ok(())
        })?;
    }
    Ok(opts)
}

fn parse_field_opts(attrs: &[syn::Attribute]) -> syn::Result<FieldOpts> {
    let mut opts = FieldOpts::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                opts.id = true;
            } else if meta.path.is_ident("reference") {
                opts.reference = true;
            } else if meta.path.is_ident("skip") {
                opts.skip = true;
            } else if meta.path.is_ident("generator") {
                let lit: LitStr = meta.value()?.parse()?;
                opts.generator = Some(lit.value());
            } else if meta.path.is_ident("collection") {
                let lit: LitStr = meta.value()?.parse()?;
                opts.collection = Some(lit.value());
            } else {
                return Err(meta.error("unknown entity field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(opts)
}

fn build_field_model(field: &syn::Field, opts: FieldOpts) -> syn::Result<FieldModel> {
    let ident = field.ident.clone().expect("named field");
    let name = ident.to_string();
    let ty = field.ty.clone();

    if opts.generator.is_some() && !opts.id {
        return Err(syn::Error::new(
            field.span(),
            "generator is only valid on the id field",
        ));
    }
    let generator = match opts.generator.as_deref() {
        None => None,
        Some("sequence") => Some(quote!(::rustliveobj::IdStrategy::Sequence)),
        Some("random") => Some(quote!(::rustliveobj::IdStrategy::Random)),
        Some("explicit") => Some(quote!(::rustliveobj::IdStrategy::Explicit)),
        Some(other) => {
            return Err(syn::Error::new(
                field.span(),
                format!("unknown id generator '{}'", other),
            ));
        }
    };

    let category = if opts.reference {
        let Some(target) = option_inner(&ty) else {
            return Err(syn::Error::new(
                field.span(),
                "reference fields must be Option<EntityType>",
            ));
        };
        FieldCategory::Reference {
            target: target.clone(),
        }
    } else if let Some(kind_name) = &opts.collection {
        if option_inner(&ty).is_some() {
            return Err(syn::Error::new(
                field.span(),
                "collection fields must be bare collection types, not Option",
            ));
        }
        collection_category(field, kind_name)?
    } else {
        let base = option_inner(&ty).unwrap_or(&ty);
        if let Some(data_type) = scalar_data_type(base) {
            FieldCategory::Scalar { data_type }
        } else if let Some(kind_name) = inferred_collection(base) {
            if option_inner(&ty).is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "collection fields must be bare collection types, not Option",
                ));
            }
            collection_category(field, kind_name)?
        } else if opts.id {
            // an id whose type is not a scalar reads as an entity-typed id;
            // surfaced as a registration-time validation error
            let target = option_inner(&ty).unwrap_or(&ty);
            FieldCategory::Reference {
                target: target.clone(),
            }
        } else {
            return Err(syn::Error::new(
                field.span(),
                "cannot infer the field kind; annotate with #[entity(...)]",
            ));
        }
    };

    Ok(FieldModel {
        ident,
        name,
        ty,
        category,
        id: opts.id,
        generator,
    })
}

fn collection_category(field: &syn::Field, kind_name: &str) -> syn::Result<FieldCategory> {
    let (kind, proxy, accessor) = match kind_name {
        "map" => (quote!(Map), quote!(LiveMap), "map_of"),
        "set" => (quote!(Set), quote!(LiveSet), "set_of"),
        "sorted_set" => (quote!(SortedSet), quote!(LiveSortedSet), "sorted_set_of"),
        "list" => (quote!(List), quote!(LiveList), "list_of"),
        "queue" => (quote!(Queue), quote!(LiveQueue), "queue_of"),
        "deque" => (quote!(Deque), quote!(LiveDeque), "deque_of"),
        "blocking_queue" => (
            quote!(BlockingQueue),
            quote!(LiveBlockingQueue),
            "blocking_queue_of",
        ),
        "blocking_deque" => (
            quote!(BlockingDeque),
            quote!(LiveBlockingDeque),
            "blocking_deque_of",
        ),
        other => {
            return Err(syn::Error::new(
                field.span(),
                format!("unknown collection kind '{}'", other),
            ));
        }
    };
    Ok(FieldCategory::Collection {
        kind: quote!(::rustliveobj::CollectionKind::#kind),
        proxy: quote!(::rustliveobj::#proxy),
        accessor: format_ident!("{}", accessor),
    })
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

fn base_ident(ty: &Type) -> Option<String> {
    let Type::Path(path) = ty else {
        return None;
    };
    Some(path.path.segments.last()?.ident.to_string())
}

fn scalar_data_type(ty: &Type) -> Option<TokenStream2> {
    let base = base_ident(ty)?;
    let data_type = match base.as_str() {
        "String" => quote!(Text),
        "i32" | "i64" | "u32" | "u64" => quote!(Integer),
        "f32" | "f64" => quote!(Float),
        "bool" => quote!(Boolean),
        "Uuid" | "DateTime" => quote!(Text),
        _ => return None,
    };
    Some(quote!(::rustliveobj::DataType::#data_type))
}

fn inferred_collection(ty: &Type) -> Option<&'static str> {
    match base_ident(ty)?.as_str() {
        "HashMap" | "BTreeMap" => Some("map"),
        "HashSet" => Some("set"),
        "BTreeSet" => Some("sorted_set"),
        "Vec" => Some("list"),
        "VecDeque" => Some("deque"),
        _ => None,
    }
}

fn descriptor_call(model: &FieldModel) -> syn::Result<TokenStream2> {
    let name = &model.name;
    Ok(match (&model.category, model.id) {
        (FieldCategory::Scalar { data_type }, false) => quote!(.field(#name, #data_type)),
        (FieldCategory::Scalar { data_type }, true) => match &model.generator {
            Some(strategy) => quote!(.id_field_with(#name, #data_type, #strategy)),
            None => quote!(.id_field(#name, #data_type)),
        },
        (FieldCategory::Collection { kind, .. }, false) => {
            quote!(.collection_field(#name, #kind))
        }
        (FieldCategory::Collection { .. }, true) => {
            return Err(syn::Error::new(
                model.ident.span(),
                "the id field cannot be a collection",
            ));
        }
        (FieldCategory::Reference { target }, false) => quote!(.reference_field(
            #name,
            <#target as ::rustliveobj::entity::Entity>::descriptor().type_name()
        )),
        (FieldCategory::Reference { target }, true) => quote!(.id_reference_field(
            #name,
            <#target as ::rustliveobj::entity::Entity>::descriptor().type_name()
        )),
    })
}

fn get_arm(model: &FieldModel) -> TokenStream2 {
    let name = &model.name;
    let ident = &model.ident;
    match &model.category {
        FieldCategory::Scalar { .. } => quote! {
            #name => ::std::result::Result::Ok(
                ::rustliveobj::codec::FieldCodec::to_value(&self.#ident)
            ),
        },
        FieldCategory::Collection { .. } => quote! {
            #name => ::std::result::Result::Ok(if self.#ident.is_empty() {
                ::rustliveobj::Value::Null
            } else {
                ::rustliveobj::codec::FieldCodec::to_value(&self.#ident)
            }),
        },
        FieldCategory::Reference { .. } => quote! {
            #name => ::rustliveobj::entity::reference_to_value(self.#ident.as_ref()),
        },
    }
}

fn set_arm(model: &FieldModel) -> TokenStream2 {
    let name = &model.name;
    let ident = &model.ident;
    match &model.category {
        FieldCategory::Scalar { .. } | FieldCategory::Collection { .. } => quote! {
            #name => {
                self.#ident = ::rustliveobj::codec::FieldCodec::from_value(value)?;
                ::std::result::Result::Ok(())
            }
        },
        FieldCategory::Reference { .. } => quote! {
            #name => {
                self.#ident = ::rustliveobj::entity::reference_from_value(value)?;
                ::std::result::Result::Ok(())
            }
        },
    }
}

fn accessor_methods(
    model: &FieldModel,
    transformation: Transformation,
    sigs: &mut Vec<TokenStream2>,
    impls: &mut Vec<TokenStream2>,
) {
    let name = &model.name;
    let ident = &model.ident;
    let ty = &model.ty;
    let getter = ident.clone();
    let setter = format_ident!("set_{}", ident);

    match &model.category {
        FieldCategory::Scalar { .. } => {
            sigs.push(quote! {
                fn #getter(&self) -> ::rustliveobj::Result<#ty>;
                fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()>;
            });
            let read = if model.id {
                quote!(::rustliveobj::codec::FieldCodec::from_value(self.object_id()))
            } else {
                quote!(self.get_typed::<#ty>(#name))
            };
            impls.push(quote! {
                fn #getter(&self) -> ::rustliveobj::Result<#ty> {
                    #read
                }

                fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()> {
                    self.set(#name, ::rustliveobj::codec::FieldCodec::to_value(&value))
                }
            });
        }
        FieldCategory::Collection {
            proxy, accessor, ..
        } => {
            if transformation == Transformation::Auto {
                let live_setter = format_ident!("set_{}_live", ident);
                sigs.push(quote! {
                    fn #getter(&self) -> ::rustliveobj::Result<#proxy>;
                    fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()>;
                    fn #live_setter(&self, value: &#proxy) -> ::rustliveobj::Result<()>;
                });
                impls.push(quote! {
                    fn #getter(&self) -> ::rustliveobj::Result<#proxy> {
                        self.#accessor(#name)
                    }

                    fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()> {
                        self.set(#name, ::rustliveobj::codec::FieldCodec::to_value(&value))
                    }

                    fn #live_setter(&self, value: &#proxy) -> ::rustliveobj::Result<()> {
                        self.set(#name, ::rustliveobj::Value::Collection(value.reference()))
                    }
                });
            } else {
                sigs.push(quote! {
                    fn #getter(&self) -> ::rustliveobj::Result<#ty>;
                    fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()>;
                });
                impls.push(quote! {
                    fn #getter(&self) -> ::rustliveobj::Result<#ty> {
                        self.get_typed::<#ty>(#name)
                    }

                    fn #setter(&self, value: #ty) -> ::rustliveobj::Result<()> {
                        self.set(#name, ::rustliveobj::codec::FieldCodec::to_value(&value))
                    }
                });
            }
        }
        FieldCategory::Reference { target } => {
            if model.id {
                // rejected at registration; no live accessors to offer
                return;
            }
            sigs.push(quote! {
                fn #getter(
                    &self,
                ) -> ::rustliveobj::Result<::std::option::Option<::rustliveobj::LiveObject<#target>>>;
                fn #setter(
                    &self,
                    value: &::rustliveobj::LiveObject<#target>,
                ) -> ::rustliveobj::Result<()>;
            });
            impls.push(quote! {
                fn #getter(
                    &self,
                ) -> ::rustliveobj::Result<::std::option::Option<::rustliveobj::LiveObject<#target>>>
                {
                    self.reference::<#target>(#name)
                }

                fn #setter(
                    &self,
                    value: &::rustliveobj::LiveObject<#target>,
                ) -> ::rustliveobj::Result<()> {
                    self.set_reference(#name, value)
                }
            });
        }
    }
}
